//! Audio output backends.
//!
//! `RodioAudioSink` resolves an audio reference's pre-signed URL to bytes
//! and plays them on the default output device. rodio's output stream is not
//! `Send`, so a dedicated playback thread owns it and receives clips over a
//! channel; completion travels back on a oneshot.

use banter_core::conversation::{AudioHandle, AudioSink};
use banter_core::error::{BanterError, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

struct PlayRequest {
    bytes: Vec<u8>,
    done: oneshot::Sender<Result<()>>,
}

/// Plays synthesized speech clips through the default audio device.
pub struct RodioAudioSink {
    client: reqwest::Client,
    requests: mpsc::UnboundedSender<PlayRequest>,
    /// The sink currently rendering audio, shared with the playback thread
    /// so `stop` can silence it mid-clip.
    current: Arc<Mutex<Option<Arc<Sink>>>>,
}

impl RodioAudioSink {
    /// Creates the sink and its playback thread.
    ///
    /// The output device is opened lazily on the first clip, so creation
    /// succeeds on machines without audio hardware; such machines surface a
    /// playback error per clip instead, which the queue skips past.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| BanterError::playback(format!("http client init failed: {}", err)))?;

        let (requests, receiver) = mpsc::unbounded_channel();
        let current = Arc::new(Mutex::new(None));
        let thread_current = Arc::clone(&current);
        std::thread::Builder::new()
            .name("banter-playback".to_string())
            .spawn(move || playback_thread(receiver, thread_current))
            .map_err(|err| BanterError::playback(format!("playback thread spawn failed: {}", err)))?;

        info!("audio playback initialized");
        Ok(Self {
            client,
            requests,
            current,
        })
    }

    async fn fetch_clip(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| BanterError::playback(format!("audio fetch failed: {}", err)))?;

        if !response.status().is_success() {
            return Err(BanterError::playback(format!(
                "audio fetch returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| BanterError::playback(format!("audio body read failed: {}", err)))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl AudioSink for RodioAudioSink {
    async fn play(&self, audio: &AudioHandle) -> Result<()> {
        let bytes = self.fetch_clip(&audio.url).await?;
        debug!(bytes = bytes.len(), "audio clip fetched");

        let (done, completion) = oneshot::channel();
        self.requests
            .send(PlayRequest { bytes, done })
            .map_err(|_| BanterError::playback("playback thread is gone"))?;

        completion
            .await
            .map_err(|_| BanterError::playback("playback thread dropped the clip"))?
    }

    fn stop(&self) {
        if let Ok(guard) = self.current.lock() {
            if let Some(sink) = guard.as_ref() {
                sink.stop();
                debug!("in-flight audio stopped");
            }
        }
    }
}

/// Blocking loop owning the rodio output stream.
fn playback_thread(
    mut requests: mpsc::UnboundedReceiver<PlayRequest>,
    current: Arc<Mutex<Option<Arc<Sink>>>>,
) {
    let mut output: Option<(OutputStream, OutputStreamHandle)> = None;

    while let Some(request) = requests.blocking_recv() {
        let result = render_clip(&mut output, &current, request.bytes);
        if let Err(err) = &result {
            warn!(error = %err, "clip rendering failed");
        }
        // Receiver may have been cancelled; that is fine.
        let _ = request.done.send(result);
    }
    debug!("playback thread shutting down");
}

fn render_clip(
    output: &mut Option<(OutputStream, OutputStreamHandle)>,
    current: &Arc<Mutex<Option<Arc<Sink>>>>,
    bytes: Vec<u8>,
) -> Result<()> {
    if output.is_none() {
        let opened = OutputStream::try_default()
            .map_err(|err| BanterError::playback(format!("no audio output device: {}", err)))?;
        *output = Some(opened);
    }
    let (_stream, handle) = output.as_ref().expect("output stream just initialized");

    let sink = Sink::try_new(handle)
        .map_err(|err| BanterError::playback(format!("sink creation failed: {}", err)))?;
    let source = Decoder::new(Cursor::new(bytes))
        .map_err(|err| BanterError::playback(format!("audio decode failed: {}", err)))?;

    sink.append(source);
    let sink = Arc::new(sink);
    if let Ok(mut guard) = current.lock() {
        *guard = Some(Arc::clone(&sink));
    }

    // Blocks until the clip ends or `stop` silences the sink.
    sink.sleep_until_end();

    if let Ok(mut guard) = current.lock() {
        *guard = None;
    }
    Ok(())
}

/// Sink that discards every clip immediately. Used when audio output is
/// disabled; playback settles as soon as the turn is appended.
#[derive(Debug, Default)]
pub struct SilentSink;

#[async_trait::async_trait]
impl AudioSink for SilentSink {
    async fn play(&self, _audio: &AudioHandle) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_creation_does_not_require_a_device() {
        // Device access is deferred to the first clip, so this succeeds in CI.
        let sink = RodioAudioSink::new(10).unwrap();
        sink.stop();
    }

    #[tokio::test]
    async fn test_silent_sink_settles_immediately() {
        let sink = SilentSink;
        let audio = AudioHandle::new("https://audio/clip", None);
        sink.play(&audio).await.unwrap();
    }
}
