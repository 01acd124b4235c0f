use std::sync::Arc;

use log::{error, Logger};
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, Reply, WithStatus};
use warp::Filter;

use crate::environment::Environment;
use crate::errors::{BackendError, ErrorKind};

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

use rejection::{Context, FlattenedRejection};

/// The largest JSON body to accept.
const MAX_CONTENT_LENGTH: u64 = 64 * 1024;

/// Every public route, with errors recovered into JSON bodies.
pub fn make_api(
    environment: Environment,
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone + Send + Sync + 'static {
    let logger = environment.logger.clone();

    make_films_route(environment.clone())
        .or(make_popular_films_route(environment.clone()))
        .or(make_film_route(environment.clone()))
        .or(make_create_film_route(environment.clone()))
        .or(make_update_film_route(environment.clone()))
        .or(make_delete_film_route(environment.clone()))
        .or(make_like_route(environment.clone()))
        .or(make_unlike_route(environment.clone()))
        .or(make_users_route(environment.clone()))
        .or(make_user_route(environment.clone()))
        .or(make_create_user_route(environment.clone()))
        .or(make_update_user_route(environment.clone()))
        .or(make_delete_user_route(environment.clone()))
        .or(make_friends_route(environment.clone()))
        .or(make_common_friends_route(environment.clone()))
        .or(make_add_friend_route(environment.clone()))
        .or(make_delete_friend_route(environment.clone()))
        .or(make_genres_route(environment.clone()))
        .or(make_genre_route(environment.clone()))
        .or(make_mpa_ratings_route(environment.clone()))
        .or(make_mpa_rating_route(environment))
        .recover(move |r| format_rejection(logger.clone(), r))
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        let status = status_code_for(e);
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?e, "status" => %status, "message" => %e);

        return Ok(with_status(json(&r.flatten()), status));
    }

    // malformed bodies and query strings never reach a handler
    let malformed = rej
        .find::<BodyDeserializeError>()
        .map(|e| e.to_string())
        .or_else(|| rej.find::<reject::InvalidQuery>().map(|e| e.to_string()));

    if let Some(message) = malformed {
        error!(logger, "Malformed request"; "status" => %StatusCode::BAD_REQUEST, "message" => %message);

        let flattened = FlattenedRejection {
            error: ErrorKind::Validation.label(),
            description: message,
            context: Context::Request {},
        };

        return Ok(with_status(json(&flattened), StatusCode::BAD_REQUEST));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    match e.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A JSON request body of bounded size.
fn body<T: serde::de::DeserializeOwned + Send>(
) -> impl Filter<Extract = (T,), Error = reject::Rejection> + Clone {
    warp::body::content_length_limit(MAX_CONTENT_LENGTH).and(warp::body::json())
}

mod internal {
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, path as p, path::param as par, post, put, query};

    use super::{body, handlers, query as q};
    use crate::environment::Environment;
    use crate::film::FilmPayload;
    use crate::label::LabelId;
    use crate::user::UserPayload;
    use crate::Id;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any()
                .map(move || environment.clone());

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_films_route => films, rt; p("films"), end(), g());
    route!(make_popular_films_route => popular_films, rt; p!("films" / "popular"), end(), g(), query::<q::PopularQuery>());
    route!(make_film_route => film, rt; p("films"), par::<Id>(), end(), g());
    route!(make_create_film_route => create_film, rt; p("films"), end(), post(), body::<FilmPayload>());
    route!(make_update_film_route => update_film, rt; p("films"), end(), put(), body::<FilmPayload>());
    route!(make_delete_film_route => delete_film, rt; p("films"), par::<Id>(), end(), delete());
    route!(make_like_route => like, rt; p!("films" / Id / "like" / Id), end(), put());
    route!(make_unlike_route => unlike, rt; p!("films" / Id / "like" / Id), end(), delete());

    route!(make_users_route => users, rt; p("users"), end(), g());
    route!(make_user_route => user, rt; p("users"), par::<Id>(), end(), g());
    route!(make_create_user_route => create_user, rt; p("users"), end(), post(), body::<UserPayload>());
    route!(make_update_user_route => update_user, rt; p("users"), end(), put(), body::<UserPayload>());
    route!(make_delete_user_route => delete_user, rt; p("users"), par::<Id>(), end(), delete());
    route!(make_friends_route => friends, rt; p!("users" / Id / "friends"), end(), g());
    route!(make_common_friends_route => common_friends, rt; p!("users" / Id / "friends" / "common" / Id), end(), g());
    route!(make_add_friend_route => add_friend, rt; p!("users" / Id / "friends" / Id), end(), put());
    route!(make_delete_friend_route => delete_friend, rt; p!("users" / Id / "friends" / Id), end(), delete());

    route!(make_genres_route => genres, rt; p("genres"), end(), g());
    route!(make_genre_route => genre, rt; p("genres"), par::<LabelId>(), end(), g());
    route!(make_mpa_ratings_route => mpa_ratings, rt; p("mpa"), end(), g());
    route!(make_mpa_rating_route => mpa_rating, rt; p("mpa"), par::<LabelId>(), end(), g());
}
