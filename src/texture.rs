// texture.rs: background image loading
//
// Each request runs on its own thread and reports back through a channel that the
// frame loop drains. Requests carry a sequence number so a slow, older load cannot
// replace the image of a newer one.

use image::io::Reader as ImageReader;
use image::RgbaImage;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureLoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image source is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    Path(PathBuf),
    Url(String),
    Bytes(Vec<u8>),
}

impl TextureSource {
    /// http(s) URLs are fetched, everything else is treated as a file path.
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            TextureSource::Url(trimmed.to_string())
        } else {
            TextureSource::Path(PathBuf::from(trimmed))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TextureSource::Path(p) => p.display().to_string(),
            TextureSource::Url(u) => u.clone(),
            TextureSource::Bytes(b) => format!("<{} dropped bytes>", b.len()),
        }
    }

    /// Blocking fetch and decode. Called from loader threads only.
    pub fn load(self) -> Result<RgbaImage, TextureLoadError> {
        match self {
            TextureSource::Path(path) => {
                let file = File::open(&path).map_err(|source| TextureLoadError::Io {
                    path: path.clone(),
                    source,
                })?;
                decode_reader(BufReader::new(file))
            }
            TextureSource::Url(url) => {
                let bytes = reqwest::blocking::get(&url)
                    .and_then(|r| r.error_for_status())
                    .and_then(|r| r.bytes())
                    .map_err(|source| TextureLoadError::Http { url, source })?;
                decode_bytes(&bytes)
            }
            TextureSource::Bytes(bytes) => decode_bytes(&bytes),
        }
    }
}

pub fn decode_bytes(bytes: &[u8]) -> Result<RgbaImage, TextureLoadError> {
    if bytes.is_empty() {
        return Err(TextureLoadError::Empty);
    }
    decode_reader(Cursor::new(bytes))
}

fn decode_reader<R: BufRead + Seek>(reader: R) -> Result<RgbaImage, TextureLoadError> {
    let mut reader = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?;
    reader.no_limits();
    Ok(reader.decode()?.to_rgba8())
}

/// Downscale so neither side exceeds `max_dimension`, keeping the aspect ratio.
pub fn fit_to_limit(image: RgbaImage, max_dimension: u32) -> RgbaImage {
    let (src_w, src_h) = image.dimensions();
    if src_w <= max_dimension && src_h <= max_dimension {
        return image;
    }

    let scale = max_dimension as f32 / src_w.max(src_h) as f32;
    let new_w = ((src_w as f32 * scale) as u32).clamp(1, max_dimension);
    let new_h = ((src_h as f32 * scale) as u32).clamp(1, max_dimension);
    log::info!("image {src_w}x{src_h} exceeds GPU limit {max_dimension}, scaling to {new_w}x{new_h}");

    image::imageops::resize(&image, new_w, new_h, image::imageops::FilterType::Lanczos3)
}

/// Result of one load request.
#[derive(Debug)]
pub struct TextureCompletion {
    pub seq: u64,
    pub source: String,
    pub result: Result<RgbaImage, TextureLoadError>,
}

pub struct TextureLoader {
    tx: Sender<TextureCompletion>,
    rx: Receiver<TextureCompletion>,
    next_seq: u64,
    in_flight: usize,
}

impl TextureLoader {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            next_seq: 1,
            in_flight: 0,
        }
    }

    /// Start loading on a background thread and return the request's sequence number.
    pub fn request(&mut self, source: TextureSource) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight += 1;

        let tx = self.tx.clone();
        let description = source.describe();
        log::info!("loading texture #{seq} from {description}");

        thread::spawn(move || {
            let result = source.load();
            let completion = TextureCompletion {
                seq,
                source: description,
                result,
            };
            if tx.send(completion).is_err() {
                log::debug!("texture #{seq} finished after the viewer was dropped");
            }
        });

        seq
    }

    /// Completions that have landed since the last call, in arrival order.
    pub fn drain(&mut self) -> Vec<TextureCompletion> {
        let mut done = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(completion) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    done.push(completion);
                }
                // the loader holds a sender itself, so Disconnected cannot happen here
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        done
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

impl Default for TextureLoader {
    fn default() -> Self {
        Self::new()
    }
}
