//! Business rules. The services validate every request before any
//! write reaches the store, and enrich what the store returns.

mod catalog;
mod film;
mod user;

pub use self::catalog::CatalogService;
pub use self::film::FilmService;
pub use self::user::UserService;
