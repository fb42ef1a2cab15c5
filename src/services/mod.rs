pub mod insights_api;
