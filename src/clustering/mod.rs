//! Clustering of tickers by behaviour
//!
//! - K-means with k-means++ seeding
//! - Silhouette scoring
//! - PCA projection for 2-D presentation
//! - Cluster summaries and equal-weight cluster portfolios

mod kmeans;
mod pca;
mod portfolio;
mod silhouette;

pub use kmeans::*;
pub use pca::*;
pub use portfolio::*;
pub use silhouette::*;
