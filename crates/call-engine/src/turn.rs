//! Turn control — one speak/listen exchange
//!
//! `speak` paces synthesized audio onto the wire at real time, one 160-byte
//! frame per 20 ms of wall clock, so the carrier's jitter buffer neither
//! starves nor floods. The wire protocol has no "synthesis finished"
//! signal, so completion is the last frame flushing plus a trailing pad
//! proportional to the text length.
//!
//! `listen` installs a fresh bridge subscription (dropping any buffered
//! audio), then debounces a single silence deadline: every inbound frame
//! reschedules it, and its expiry marks end of utterance. An absolute
//! ceiling bounds the whole listen; a media-stream drop fails the turn
//! immediately rather than waiting out the ceiling.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use switchboard_audio_core::{
    decode_mulaw_slice, encode_mulaw_slice, wav_container, Downsampler, FrameChunker,
    SampleAssembler, FRAME_DURATION, WIRE_SAMPLE_RATE,
};
use switchboard_provider_core::{PcmStream, SttProvider, TtsProvider};
use tokio::time::{interval, sleep, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::session::{CallSession, Speaker};

/// Fixed re-prompt spoken when a reply is too short to act on
pub const ELABORATION_PROMPT: &str = "Could you elaborate a bit more?";

/// Trailing pad per character of spoken text, covering carrier-side
/// playback of frames already queued on the wire.
const TRAILING_PAD_PER_CHAR: Duration = Duration::from_millis(50);

/// Drives speak/listen turns for one call.
pub struct TurnController {
    session: Arc<CallSession>,
    tts: Arc<dyn TtsProvider>,
    stt: Arc<dyn SttProvider>,
    silence_threshold: Duration,
    response_timeout: Duration,
    elaboration_threshold: usize,
}

impl TurnController {
    pub fn new(
        session: Arc<CallSession>,
        tts: Arc<dyn TtsProvider>,
        stt: Arc<dyn SttProvider>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            session,
            tts,
            stt,
            silence_threshold: config.silence_threshold,
            response_timeout: config.response_timeout,
            elaboration_threshold: config.elaboration_threshold,
        }
    }

    /// Synthesize `text` and play it onto the call at real-time pace.
    pub async fn speak(&self, text: &str) -> EngineResult<()> {
        let bridge = self.session.media()?;
        info!(call_id = %self.session.id(), chars = text.len(), "speaking");

        let stream: PcmStream = match self.tts.synthesize_stream(text).await {
            Ok(stream) => stream,
            Err(error) => {
                warn!(%error, "streaming synthesis unavailable, falling back to batch");
                let bytes = self.tts.synthesize(text).await?;
                Box::pin(futures::stream::once(async move { Ok(bytes) }))
            }
        };
        let mut stream = stream;

        let mut assembler = SampleAssembler::new();
        let mut downsampler = Downsampler::new(self.tts.sample_rate(), WIRE_SAMPLE_RATE)?;
        let mut chunker = FrameChunker::new();

        let mut ticker = interval(FRAME_DURATION);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        'synthesis: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let samples = assembler.push(&chunk);
            let wire_samples = downsampler.process(&samples);
            chunker.push(&encode_mulaw_slice(&wire_samples));

            while let Some(frame) = chunker.next_frame() {
                ticker.tick().await;
                if !bridge.is_open() {
                    debug!(call_id = %self.session.id(), "media closed mid-speak, stopping early");
                    break 'synthesis;
                }
                bridge.send_frame(&frame);
            }
        }
        if let Some(frame) = chunker.flush() {
            ticker.tick().await;
            bridge.send_frame(&frame);
        }

        // No end-of-playback signal exists; pad for the carrier to drain.
        sleep(TRAILING_PAD_PER_CHAR * text.chars().count() as u32).await;

        self.session.push_transcript(Speaker::Agent, text);
        Ok(())
    }

    /// Capture and transcribe the caller's reply.
    pub async fn listen(&self) -> EngineResult<String> {
        let bridge = self.session.media()?;
        debug!(call_id = %self.session.id(), "listening");

        // A fresh subscription discards anything buffered before the turn.
        let mut inbound = bridge.subscribe();
        let mut audio: Vec<u8> = Vec::new();

        let ceiling = Instant::now() + self.response_timeout;
        let mut silence_deadline: Option<Instant> = None;

        loop {
            let silence = async {
                match silence_deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                frame = inbound.recv() => match frame {
                    Some(bytes) => {
                        audio.extend_from_slice(&bytes);
                        silence_deadline = Some(Instant::now() + self.silence_threshold);
                    }
                    None => {
                        return Err(EngineError::MediaClosed);
                    }
                },
                _ = silence => break,
                _ = sleep_until(ceiling) => {
                    bridge.clear_subscriber();
                    return Err(EngineError::ResponseTimeout {
                        seconds: self.response_timeout.as_secs(),
                    });
                }
            }
        }
        bridge.clear_subscriber();

        let text = if audio.is_empty() {
            String::new()
        } else {
            let pcm = decode_mulaw_slice(&audio);
            self.stt.recognize(wav_container(&pcm)).await
        };
        info!(call_id = %self.session.id(), chars = text.len(), "caller reply transcribed");
        self.session.push_transcript(Speaker::Caller, &text);
        Ok(text)
    }

    /// One full exchange: speak, listen, and at most one elaboration
    /// re-prompt when the reply is under the word threshold. Both replies
    /// are joined by a blank line.
    pub async fn speak_and_listen(&self, text: &str) -> EngineResult<String> {
        self.speak(text).await?;
        let reply = self.listen().await?;

        if word_count(&reply) < self.elaboration_threshold {
            debug!(
                call_id = %self.session.id(),
                words = word_count(&reply),
                "short reply, asking for elaboration"
            );
            self.speak(ELABORATION_PROMPT).await?;
            let elaboration = self.listen().await?;
            return Ok(format!("{reply}\n\n{elaboration}"));
        }
        Ok(reply)
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
