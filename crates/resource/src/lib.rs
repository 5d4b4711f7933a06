//! Asset lookup: maps image references in a document to files across the
//! document directory and the configured asset roots.

mod assets;

pub use assets::{rebase_images, relative_href, AssetResolver, UnresolvedAsset};
