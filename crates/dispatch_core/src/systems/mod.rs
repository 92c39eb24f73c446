pub mod candidate_selection;
pub mod load_ingest;
pub mod period_end;
pub mod rank_and_notify;
pub mod refine_distances;
pub mod score_candidates;
pub mod truck_ingest;

pub use candidate_selection::candidate_selection_system;
pub use load_ingest::load_ingest_system;
pub use period_end::period_end_system;
pub use rank_and_notify::rank_and_notify_system;
pub use refine_distances::refine_distances_system;
pub use score_candidates::score_candidates_system;
pub use truck_ingest::truck_ingest_system;
