//! One-shot prompt: send it, stream the answer to the terminal.

use std::error::Error;
use std::io::{self, Write};
use std::path::Path;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::transport::HttpTransport;
use crate::core::config::Config;
use crate::core::keyring::resolve_api_key;
use crate::core::message::ContentPart;
use crate::core::stream::{ChatRequest, Mutation, SessionOutcome, StreamNotice, StreamSession};
use crate::core::transcript::Transcript;
use crate::utils::logging::LoggingState;
use crate::utils::url::is_remote_image_reference;

pub struct SayOptions {
    pub prompt: String,
    pub model: Option<String>,
    pub images: Vec<String>,
    pub log: Option<String>,
}

pub async fn run_say(options: SayOptions) -> Result<(), Box<dyn Error>> {
    if options.prompt.trim().is_empty() && options.images.is_empty() {
        return Err("Nothing to send. Usage: parley say [-m MODEL] <prompt>".into());
    }

    let config = Config::load()?;
    let model = options
        .model
        .or_else(|| config.default_model.clone())
        .ok_or("No model selected. Pass -m <MODEL> or run 'parley set default-model <MODEL>'.")?;
    let (api_key, key_source) = resolve_api_key()?
        .ok_or("No API key found. Run 'parley auth' or set PARLEY_API_KEY.")?;
    debug!(%key_source, %model, "starting chat request");

    let logging = LoggingState::new(options.log.or_else(|| config.log_file.clone()))?;

    let mut content = Vec::new();
    if !options.prompt.trim().is_empty() {
        content.push(ContentPart::text(options.prompt));
    }
    for image in &options.images {
        content.push(load_image(image)?);
    }

    let mut transcript = Transcript::new();
    transcript.push_user(content);
    let request = ChatRequest {
        model,
        api_key,
        messages: transcript.api_messages(),
    };
    let transport = HttpTransport::new(reqwest::Client::new(), config.base_url());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_notices(rx));

    let report = StreamSession::new(&mut transcript, config.session_options())
        .with_notices(tx)
        .submit(&transport, request, cancel)
        .await?;
    printer.await??;

    for diagnostic in &report.diagnostics {
        debug!(kind = ?diagnostic.kind, detail = %diagnostic.detail, "stream diagnostic");
    }
    if logging.is_active() {
        if let Err(e) = logging.log_entries(transcript.entries()) {
            warn!("Failed to write log ({}): {e}", logging.get_status_string());
        }
    }

    match report.outcome {
        SessionOutcome::Completed => Ok(()),
        SessionOutcome::Cancelled => {
            eprintln!("⏹ Response cancelled");
            Ok(())
        }
        SessionOutcome::Failed(message) => Err(message.into()),
    }
}

async fn print_notices(mut rx: mpsc::UnboundedReceiver<StreamNotice>) -> io::Result<()> {
    let mut stdout = io::stdout();
    let mut printed_any = false;

    while let Some(notice) = rx.recv().await {
        match notice {
            StreamNotice::Mutated { mutation, .. } => match mutation {
                Mutation::PlaceholderReplaced { text, .. } => {
                    write!(stdout, "{text}")?;
                    stdout.flush()?;
                    printed_any = true;
                }
                Mutation::ContentAppended { delta, .. } => {
                    write!(stdout, "{delta}")?;
                    stdout.flush()?;
                    printed_any = true;
                }
                Mutation::ToolAppended {
                    tool_name, phase, ..
                } => {
                    eprintln!("🔎 {tool_name} {}", phase.as_str());
                }
                _ => {}
            },
            StreamNotice::Finished { .. } => {
                if printed_any {
                    writeln!(stdout)?;
                }
            }
            StreamNotice::PendingOpened { .. } | StreamNotice::PendingCleared { .. } => {}
        }
    }
    Ok(())
}

/// Build an image part from a URL or a local file.
pub fn load_image(reference: &str) -> Result<ContentPart, Box<dyn Error>> {
    if is_remote_image_reference(reference) {
        return Ok(ContentPart::image(reference.trim(), None));
    }

    let path = Path::new(reference);
    let mime = image_mime_for_path(path)
        .ok_or_else(|| format!("Unsupported image type: {}", path.display()))?;
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Could not read image {}: {e}", path.display()))?;
    Ok(ContentPart::image_data_url(mime, &bytes))
}

fn image_mime_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn mime_follows_extension() {
        assert_eq!(image_mime_for_path(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(image_mime_for_path(Path::new("b.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime_for_path(Path::new("c.webp")), Some("image/webp"));
        assert_eq!(image_mime_for_path(Path::new("d.bmp")), None);
        assert_eq!(image_mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn remote_images_pass_through() {
        let part = load_image("https://example.com/cat.png").expect("remote image");
        assert_eq!(part, ContentPart::image("https://example.com/cat.png", None));
    }

    #[test]
    fn local_images_become_data_urls() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("dot.png");
        std::fs::write(&path, b"abc").expect("write image");

        let part = load_image(&path.to_string_lossy()).expect("local image");
        match part {
            ContentPart::ImageReference { url, .. } => {
                assert_eq!(url, "data:image/png;base64,YWJj");
            }
            other => panic!("expected image part, got {other:?}"),
        }
    }

    #[test]
    fn missing_local_image_is_an_error() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("missing.png");
        let err = load_image(&path.to_string_lossy()).expect_err("missing file");
        assert!(err.to_string().starts_with("Could not read image"));
    }
}
