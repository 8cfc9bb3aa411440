mod repository;

pub use repository::RecordRepository;
