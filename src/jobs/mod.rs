pub mod fix_award_ids;
pub mod link_file_c;
pub mod update_awards;

pub use fix_award_ids::{run_fix_award_ids, FixSummary};
pub use link_file_c::{run_link_file_c, LinkSummary};
pub use update_awards::{run_update_awards, UpdateSummary};
