pub mod batch;
pub mod bookmark;
pub mod catalogue;
pub mod info;
pub mod outline;

use crate::cli::CatalogueArgs;
use crate::pdf::catalogue::CatalogueOptions;

impl From<CatalogueArgs> for CatalogueOptions {
    fn from(args: CatalogueArgs) -> Self {
        CatalogueOptions {
            page_offset: args.offset,
            pages: args.toc_pages,
            matcher: args.matcher,
        }
    }
}
