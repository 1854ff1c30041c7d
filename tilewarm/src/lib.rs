//! tilewarm - Map tile cache warming
//!
//! This library requests every tile that covers a geographic region, over a
//! range of zoom levels, against a tile server URL template. The point is to
//! populate a tile cache (CDN, proxy, tile server cache) before real users
//! ask for those tiles.
//!
//! # Layout
//!
//! - [`region`]: region polygons from a buffered point or a GeoJSON file
//! - [`coord`]: Web Mercator math and polygon covering
//! - [`tile`]: tile coordinates, batching per zoom, URL templates
//! - [`retry`]: bounded retry with backoff
//! - [`pool`]: bounded concurrent execution
//! - [`stats`]: response/processing time statistics
//! - [`http`]: HTTP client seam
//! - [`warmer`]: the orchestrator tying it all together
//! - [`config`], [`logging`]: ambient setup used by the CLI

pub mod config;
pub mod coord;
pub mod http;
pub mod logging;
pub mod pool;
pub mod region;
pub mod retry;
pub mod stats;
pub mod tile;
pub mod warmer;
