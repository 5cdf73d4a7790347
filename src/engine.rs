use crate::decode::{Bitmap, BitmapDecoder, DecodeRequest};
use crate::error::GradientError;
use crate::render::gradient::{GradientOptions, GradientOverrides, GradientResult};
use crate::render::histogram::ColorHistogram;
use crate::render::result_cache::{CacheConfig, GradientCache, Lookup};
use crate::render::{sampler, selector};
use futures::FutureExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Derives card gradients from logo images and remembers them.
///
/// One engine per host application. Clones share the decoder and the cache.
#[derive(Clone)]
pub struct GradientEngine {
    decoder: Arc<dyn BitmapDecoder>,
    cache: Arc<Mutex<GradientCache>>,
}

impl GradientEngine {
    pub fn new(decoder: Arc<dyn BitmapDecoder>, cache: CacheConfig) -> Self {
        Self {
            decoder,
            cache: Arc::new(Mutex::new(GradientCache::new(cache))),
        }
    }

    /// Gradient for the image at `url`.
    ///
    /// A cached result is returned without decoding or yielding. Otherwise the
    /// image is decoded once; callers asking for the same key meanwhile wait on
    /// that same decode. Failures are not cached.
    pub async fn extract_gradient(
        &self,
        url: &str,
        overrides: &GradientOverrides,
    ) -> Result<Arc<GradientResult>, GradientError> {
        let options = GradientOptions::with_overrides(overrides);

        let work = {
            let mut cache = lock(&self.cache);
            let key = cache.key(url, &options);
            match cache.lookup(&key) {
                Lookup::Hit(result) => {
                    log::debug!("gradient cache hit: {url}");
                    return Ok(result);
                }
                Lookup::Joined(work) => {
                    log::debug!("gradient already in flight: {url}");
                    work
                }
                Lookup::Miss => {
                    log::debug!("gradient cache miss: {url}");
                    let decoder = Arc::clone(&self.decoder);
                    // The pending slot owns this future; the future must not own the cache back.
                    let shared_cache = Arc::downgrade(&self.cache);
                    let slot_key = key.clone();
                    let url = url.to_string();
                    let id = cache.next_ticket();

                    let work = async move {
                        let outcome = decode_and_extract(decoder.as_ref(), &url, &options).await;
                        if let Some(shared_cache) = shared_cache.upgrade() {
                            let mut cache = lock(&shared_cache);
                            match &outcome {
                                Ok(result) => cache.complete(&slot_key, id, Arc::clone(result)),
                                Err(_) => cache.fail(&slot_key, id),
                            }
                        }
                        outcome
                    }
                    .boxed()
                    .shared();

                    cache.begin(key, id, work.clone());
                    work
                }
            }
        };

        work.await
    }

    pub fn cached_len(&self) -> usize {
        lock(&self.cache).len()
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.cache).pending()
    }

    /// Forgets every result for `url`. The next call decodes again.
    pub fn invalidate(&self, url: &str) -> usize {
        lock(&self.cache).invalidate(url)
    }

    pub fn clear_cache(&self) {
        lock(&self.cache).clear();
    }
}

async fn decode_and_extract(
    decoder: &dyn BitmapDecoder,
    url: &str,
    options: &GradientOptions,
) -> Result<Arc<GradientResult>, GradientError> {
    let bitmap = decoder.decode(url, DecodeRequest { allow_cross_origin: true }).await?;
    extract_from_bitmap(&bitmap, options).map(Arc::new)
}

/// The synchronous part of an extraction: sample, count, pick, compose.
pub fn extract_from_bitmap(bitmap: &Bitmap, options: &GradientOptions) -> Result<GradientResult, GradientError> {
    let raster = sampler::resample(bitmap)?;
    log::debug!(
        "sampling {}x{} (source {}x{}) every {} px",
        raster.width(),
        raster.height(),
        bitmap.width,
        bitmap.height,
        options.sample_rate
    );

    let samples = sampler::sample_pixels(raster.as_raw(), options.sample_rate);
    let hist = ColorHistogram::build(samples, options.luminance_threshold);
    let (primary, secondary) = selector::select(&hist, options.min_contrast);
    Ok(GradientResult::new(options.angle, primary, secondary))
}

fn lock(cache: &Mutex<GradientCache>) -> MutexGuard<'_, GradientCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}
