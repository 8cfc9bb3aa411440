use log::debug;
use std::collections::HashMap;
use std::sync::RwLock;

use trimlog_core::sync::{IndicatorColor, SyncIndicator};

/// In-process indicator: remembers the latest color per table.
#[derive(Debug, Default)]
pub struct IndicatorPanel {
    colors: RwLock<HashMap<String, IndicatorColor>>,
}

impl IndicatorPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(&self, table: &str) -> Option<IndicatorColor> {
        self.colors
            .read()
            .ok()
            .and_then(|colors| colors.get(table).copied())
    }

    /// Asset path of the table's current color.
    pub fn asset(&self, table: &str) -> Option<&'static str> {
        self.color(table).map(IndicatorColor::asset)
    }

    pub fn snapshot(&self) -> HashMap<String, IndicatorColor> {
        self.colors
            .read()
            .map(|colors| colors.clone())
            .unwrap_or_default()
    }
}

impl SyncIndicator for IndicatorPanel {
    fn set_color(&self, table: &str, color: IndicatorColor) {
        debug!("Indicator '{}' -> {:?}", table, color);
        if let Ok(mut colors) = self.colors.write() {
            colors.insert(table.to_string(), color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_color_wins() {
        let panel = IndicatorPanel::new();
        assert_eq!(panel.color("clients"), None);

        panel.set_color("clients", IndicatorColor::Yellow);
        panel.set_color("clients", IndicatorColor::Green);

        assert_eq!(panel.color("clients"), Some(IndicatorColor::Green));
        assert_eq!(panel.asset("clients"), Some("assets/indicators/green.svg"));
        assert_eq!(panel.snapshot().len(), 1);
    }
}
