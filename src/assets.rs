//! Named visual assets.
//!
//! Assets are character sprites looked up from a built-in table. Loading
//! runs on a worker thread and completes as one batch: either every
//! requested name resolves or the whole batch fails.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::style::Color;
use log::{info, warn};

use crate::error::AssetError;

/// Shading ramp for lit bodies, darkest first
pub const BODY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];
/// Ramp for the sun
pub const STAR_RAMP: &[char] = &['*', 'o', 'O', '@'];
/// Panels are drawn as text and carry no ramp
pub const NO_RAMP: &[char] = &[];

/// How a sprite is drawn
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    pub name: String,
    pub ramp: &'static [char],
    pub color: Color,
    /// Emissive sprites ignore lighting
    pub emissive: bool,
}

/// Opaque shared handle to a loaded sprite
#[derive(Clone, Debug, PartialEq)]
pub struct AssetHandle(Arc<Sprite>);

impl AssetHandle {
    pub fn sprite(&self) -> &Sprite {
        &self.0
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }
}

/// Looks up a sprite in the built-in table
pub fn builtin_sprite(name: &str) -> Option<Sprite> {
    let (ramp, color, emissive) = match name {
        "Sol" => (STAR_RAMP, Color::Yellow, true),
        "Mercury" => (BODY_RAMP, Color::Grey, false),
        "Venus" => (BODY_RAMP, Color::DarkYellow, false),
        "Earth" => (BODY_RAMP, Color::Blue, false),
        "Luna" => (BODY_RAMP, Color::White, false),
        "Mars" => (BODY_RAMP, Color::Red, false),
        "Jupiter" => (BODY_RAMP, Color::DarkYellow, false),
        "Saturn" => (BODY_RAMP, Color::Yellow, false),
        "Uranus" => (BODY_RAMP, Color::Cyan, false),
        "Neptune" => (BODY_RAMP, Color::DarkBlue, false),
        "SolarControls" => (NO_RAMP, Color::White, true),
        _ => return None,
    };
    Some(Sprite {
        name: name.to_string(),
        ramp,
        color,
        emissive,
    })
}

/// A completed batch
#[derive(Clone, Debug, Default)]
pub struct AssetSet {
    assets: HashMap<String, AssetHandle>,
}

impl AssetSet {
    pub fn get(&self, name: &str) -> Result<AssetHandle, AssetError> {
        self.assets
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Resolves every name or fails on the first unknown one
pub fn load_batch(names: &[String]) -> Result<AssetSet, AssetError> {
    let mut assets = HashMap::with_capacity(names.len());
    for name in names {
        let sprite = builtin_sprite(name).ok_or_else(|| AssetError::NotFound(name.clone()))?;
        assets.insert(name.clone(), AssetHandle(Arc::new(sprite)));
    }
    Ok(AssetSet { assets })
}

/// Starts background batch loads
#[derive(Clone, Debug, Default)]
pub struct AssetLoader {
    /// Artificial delay before the batch completes
    pub latency: Duration,
}

impl AssetLoader {
    pub fn new(latency: Duration) -> Self {
        AssetLoader { latency }
    }

    pub fn load_all<I, S>(&self, names: I) -> PendingAssets
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let latency = self.latency;
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            if !latency.is_zero() {
                thread::sleep(latency);
            }
            // The receiver may already be gone if the app quit early
            let _ = sender.send(load_batch(&names));
        });
        PendingAssets {
            receiver,
            done: false,
        }
    }
}

/// An in-flight batch, polled once per frame
#[derive(Debug)]
pub struct PendingAssets {
    receiver: Receiver<Result<AssetSet, AssetError>>,
    done: bool,
}

impl PendingAssets {
    /// Yields the batch result exactly once
    pub fn poll(&mut self) -> Option<Result<AssetSet, AssetError>> {
        if self.done {
            return None;
        }
        let result = match self.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(AssetError::Disconnected),
        };
        self.done = true;
        match &result {
            Ok(set) => info!("loaded {} assets", set.len()),
            Err(err) => warn!("asset batch failed: {err}"),
        }
        Some(result)
    }

    /// Blocks until the batch completes
    pub fn wait(mut self) -> Result<AssetSet, AssetError> {
        if self.done {
            return Err(AssetError::Disconnected);
        }
        self.done = true;
        self.receiver.recv().unwrap_or(Err(AssetError::Disconnected))
    }
}
