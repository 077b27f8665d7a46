/// Job identifiers are opaque strings assigned by the scraping service.
pub type JobId = String;

/// All client-side timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
