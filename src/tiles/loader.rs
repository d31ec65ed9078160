use crate::core::geo::TileCoord;
use crate::core::viewport::Viewport;
use crate::layers::tile::TileLayer;
use crate::prelude::HashSet;
use crate::tiles::cache::TileCache;
use crate::{MapError, Result};
use crossbeam_channel::{Receiver, Sender};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use std::thread;

/// Shared blocking HTTP client. Public tile servers (OpenStreetMap in
/// particular) reject requests without a User-Agent.
static HTTP_CLIENT: OnceCell<Client> = OnceCell::new();

const USER_AGENT: &str = concat!("issuemap/", env!("CARGO_PKG_VERSION"));

fn http_client() -> Result<&'static Client> {
    HTTP_CLIENT.get_or_try_init(|| {
        Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(MapError::from)
    })
}

/// A tile decoded to straight RGBA8 pixels
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTile {
    pub size: [usize; 2],
    pub rgba: Vec<u8>,
}

impl DecodedTile {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| MapError::Layer(format!("tile decode failed: {}", e)))?
            .to_rgba8();
        let size = [image.width() as usize, image.height() as usize];
        Ok(Self {
            size,
            rgba: image.into_raw(),
        })
    }
}

enum TileMessage {
    Loaded(TileCoord, DecodedTile),
    Failed(TileCoord),
}

/// Downloads tiles on detached threads and hands them back to the UI
/// thread through [`TileLoader::poll`].
///
/// A failed download is logged and its coordinate remembered. It is not
/// requested again until [`TileLoader::forget_failures`] is called, which the
/// widget does whenever the view moves.
pub struct TileLoader {
    cache: TileCache<DecodedTile>,
    failed: HashSet<TileCoord>,
    tx: Sender<TileMessage>,
    rx: Receiver<TileMessage>,
}

impl TileLoader {
    pub fn new(cache_capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            cache: TileCache::new(cache_capacity),
            failed: HashSet::default(),
            tx,
            rx,
        }
    }

    pub fn cache(&self) -> &TileCache<DecodedTile> {
        &self.cache
    }

    /// Requests every tile of `layer` that covers `viewport` and is neither
    /// cached, in flight nor recently failed. Returns the number of new requests.
    pub fn request_visible(&mut self, layer: &TileLayer, viewport: &Viewport) -> usize {
        let mut started = 0;
        for coord in layer.visible_tiles(viewport) {
            if self.failed.contains(&coord) {
                continue;
            }
            if self.cache.begin_request(coord) {
                self.start_download(layer.tile_url(coord), coord);
                started += 1;
            }
        }
        started
    }

    fn start_download(&self, url: String, coord: TileCoord) {
        let tx = self.tx.clone();

        thread::spawn(move || {
            log::debug!("fetch tile {:?} from {}", coord, url);
            let result = (|| -> Result<DecodedTile> {
                let response = http_client()?.get(&url).send()?.error_for_status()?;
                let bytes = response.bytes()?;
                DecodedTile::decode(&bytes)
            })();

            let message = match result {
                Ok(tile) => {
                    log::debug!("tile {:?} ready ({}x{})", coord, tile.size[0], tile.size[1]);
                    TileMessage::Loaded(coord, tile)
                }
                Err(e) => {
                    log::warn!("tile {:?} download failed: {}", coord, e);
                    TileMessage::Failed(coord)
                }
            };
            // The loader may already be gone when the app is closing
            let _ = tx.send(message);
        });
    }

    /// Moves finished downloads into the cache. Returns how many tiles arrived.
    pub fn poll(&mut self) -> usize {
        let mut loaded = 0;
        for message in self.rx.try_iter() {
            match message {
                TileMessage::Loaded(coord, tile) => {
                    self.cache.insert(coord, tile);
                    loaded += 1;
                }
                TileMessage::Failed(coord) => {
                    self.cache.cancel_request(&coord);
                    self.failed.insert(coord);
                }
            }
        }
        loaded
    }

    pub fn pending_count(&self) -> usize {
        self.cache.pending_count()
    }

    /// Allows failed tiles to be requested again
    pub fn forget_failures(&mut self) {
        self.failed.clear();
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}
