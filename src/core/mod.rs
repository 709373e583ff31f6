pub mod canonical;
pub mod exporter;

pub use crate::domain::model::{
    DashboardDocument, DashboardSummary, ExportReport, ExportedDashboard,
};
pub use crate::domain::ports::{ConfigProvider, DashboardSource, Storage};
pub use crate::utils::error::Result;
