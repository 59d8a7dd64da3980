//! Data models for the price-tracking service.
//!
//! - `User`: the authenticated principal returned by the auth endpoints
//! - `Product`, `PriceStatus`: tracked items and where their price stands
//! - Request/response bodies for the auth and tracking endpoints

pub mod product;
pub mod user;

pub use product::{PriceStatus, Product, TrackRequest, TrackResponse};
pub use user::{AuthResponse, LoginRequest, MeResponse, SignupRequest, User, UserId};
