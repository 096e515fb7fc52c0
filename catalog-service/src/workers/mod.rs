pub mod staleness_job;

pub use staleness_job::StalenessJob;
