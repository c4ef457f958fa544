pub mod catalog;
pub mod classify;
pub mod error;
pub mod extract;
pub mod feeds;
pub mod fetch;
pub mod generic;
pub mod html;
pub mod investigate;
pub mod jsonld;
pub mod links;
pub mod resolve;
pub(crate) mod retry;
pub mod sitemap;

pub use catalog::{CatalogEntry, CatalogIndex, CatalogMatch, MatchKind};
pub use classify::{classify, classify_with_markers, PageSignature};
pub use error::ScraperError;
pub use extract::{ExtractedFields, ExtractionAdapter, GenericAdapter, SelectorAdapter};
pub use fetch::{FetchKind, FetchSettings, FetchedPage, Fetcher, HttpFetcher, SiteFetcher};
pub use generic::{Baseline, GenericReason, GenericityFilter};
pub use investigate::{investigate, SiteReport, StrategyReport};
pub use links::{best_link, collect_product_links, score_link, ProductLink};
pub use resolve::{
    Evidence, FailureReason, ResolveFailure, ResolveOutcome, ResolvedProduct, Resolver,
    ResolverSettings,
};
