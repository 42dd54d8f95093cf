use std::path::PathBuf;

use clap::Parser;

use crate::host::SurfaceSupport;

pub const DEFAULT_PAGE_URL: &str = "https://example.com/article";

#[derive(Parser, Debug)]
#[command(
    name = "sentilens",
    version,
    about = "Select text on a page and see its sentiment"
)]
pub struct Cli {
    #[arg(help = "Text selected on the simulated page")]
    pub text: String,
    #[arg(long, default_value = DEFAULT_PAGE_URL, help = "Address of the simulated page")]
    pub page_url: String,
    #[arg(long, help = "Host has no way to open the result surface")]
    pub no_popup: bool,
    #[arg(long, conflicts_with = "no_popup", help = "Opening the result surface fails")]
    pub popup_fails: bool,
    #[arg(
        long,
        help = "Open the result surface and use its \"current page selection\" action"
    )]
    pub from_page: bool,
    #[arg(long, help = "Settings file (JSON); defaults apply when missing")]
    pub settings: Option<PathBuf>,
    #[arg(long = "endpoint", help = "Override result surface endpoints, in try order")]
    pub endpoints: Vec<String>,
    #[arg(long, default_value_t = 30, help = "Seconds to wait for a rendered result")]
    pub wait_secs: u64,
}

impl Cli {
    pub fn surface_support(&self) -> SurfaceSupport {
        if self.no_popup {
            SurfaceSupport::Absent
        } else if self.popup_fails {
            SurfaceSupport::Failing
        } else {
            SurfaceSupport::Available
        }
    }
}
