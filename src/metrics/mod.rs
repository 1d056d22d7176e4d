//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Recolección de métricas del servidor:
//! - Contadores de requests (total, por handler, errores)
//! - Latencias (p50, p95, p99)
//! - Workers ocupados
//! - Eventos de login, registro y posts

pub mod collector;

pub use collector::{Event, MetricsCollector, MetricsSnapshot};
