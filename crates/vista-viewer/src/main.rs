mod loader;

use anyhow::Result;
use vista_engine::logging::{LoggingConfig, init_logging};
use vista_engine::viewer::{Viewer, ViewerConfig};
use vista_engine::window::Runtime;

use crate::loader::CubeLoader;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    log::info!("drop a file onto the window to load it (try one named `cube`)");

    let config = ViewerConfig::default();
    let runtime = config.runtime.clone();
    let gpu = config.gpu.clone();

    Runtime::run(runtime, gpu, Viewer::new(config, CubeLoader::default()))
}
