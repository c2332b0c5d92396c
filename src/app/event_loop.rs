use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::app::view;
use crate::dates::{DateInput, DateLibrary};
use crate::pipes::{ChannelDetector, DirectZone, TimeAgoPipe};

/// Keep one time-ago line on `out` until `shutdown` resolves, and return
/// how many times it was rendered.
///
/// The pipe is bound to this loop: every refresh request it sends triggers a
/// render, and each render calls `transform` again, which arms the next refresh.
pub async fn run<W, F>(
    dates: DateLibrary,
    input: DateInput,
    omit_suffix: bool,
    out: &mut W,
    shutdown: F,
) -> Result<u64>
where
    W: Write,
    F: Future<Output = ()>,
{
    let (detector, mut refresh_rx) = ChannelDetector::channel();
    let pipe = TimeAgoPipe::new(dates, Arc::new(detector), Arc::new(DirectZone));
    let mut renders = 0u64;
    tokio::pin!(shutdown);

    loop {
        let text = pipe.transform(input.clone(), omit_suffix)?;
        view::render(out, &text)?;
        renders += 1;
        debug!(renders, delay = ?pipe.pending_delay(), "Rendered");

        tokio::select! {
            Some(()) = refresh_rx.recv() => {}
            _ = &mut shutdown => {
                info!(renders, "Shutdown requested");
                break;
            }
        }
    }

    pipe.dispose();
    writeln!(out)?;
    Ok(renders)
}

/// Render once without scheduling anything that outlives the call.
pub fn render_once(dates: DateLibrary, input: DateInput, omit_suffix: bool) -> Result<String> {
    let pipe = TimeAgoPipe::detached(dates);
    let text = pipe.transform(input, omit_suffix)?;
    pipe.dispose();
    Ok(text)
}
