pub mod award_view;
pub mod download_job;
pub mod subaward_view;
pub mod transaction_view;

pub use award_view::Entity as AwardView;
pub use download_job::Entity as DownloadJob;
pub use download_job::JobStatus;
pub use subaward_view::Entity as SubawardView;
pub use transaction_view::Entity as TransactionView;
