use std::time::{Duration, Instant};

use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::environment::Environment;
use crate::film::FilmPayload;
use crate::label::LabelId;
use crate::routes::{
    query::PopularQuery,
    rejection::{Context, Rejection},
};
use crate::user::UserPayload;
use crate::Id;

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($body:tt)*) => {{
        let start = Instant::now();

        let result = { $($body)* };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    }};
}

pub async fn films(environment: Environment) -> RouteResult {
    timed! {
        let films = environment
            .films
            .all()
            .await
            .map_err(|e| Rejection::new(Context::Listing { collection: "films" }, e))?;

        json(&films)
    }
}

pub async fn popular_films(environment: Environment, query: PopularQuery) -> RouteResult {
    timed! {
        let count = query.count.unwrap_or(environment.config.popular_count);

        let films = environment
            .films
            .popular(count)
            .await
            .map_err(|e| Rejection::new(Context::Popular { count }, e))?;

        json(&films)
    }
}

pub async fn film(environment: Environment, id: Id) -> RouteResult {
    timed! {
        let film = environment
            .films
            .find(id)
            .await
            .map_err(|e| Rejection::new(Context::Film { id }, e))?;

        json(&film)
    }
}

pub async fn create_film(environment: Environment, payload: FilmPayload) -> RouteResult {
    timed! {
        let film = environment
            .films
            .create(payload)
            .await
            .map_err(|e| Rejection::new(Context::FilmSubmission { id: None }, e))?;

        with_status(json(&film), StatusCode::CREATED)
    }
}

pub async fn update_film(environment: Environment, payload: FilmPayload) -> RouteResult {
    timed! {
        let id = payload.id;

        let film = environment
            .films
            .update(payload)
            .await
            .map_err(|e| Rejection::new(Context::FilmSubmission { id }, e))?;

        json(&film)
    }
}

pub async fn delete_film(environment: Environment, id: Id) -> RouteResult {
    timed! {
        environment
            .films
            .delete(id)
            .await
            .map_err(|e| Rejection::new(Context::Film { id }, e))?;

        StatusCode::NO_CONTENT
    }
}

pub async fn like(environment: Environment, film_id: Id, user_id: Id) -> RouteResult {
    timed! {
        let film = environment
            .films
            .like(film_id, user_id)
            .await
            .map_err(|e| Rejection::new(Context::Like { film_id, user_id }, e))?;

        json(&film)
    }
}

pub async fn unlike(environment: Environment, film_id: Id, user_id: Id) -> RouteResult {
    timed! {
        let film = environment
            .films
            .unlike(film_id, user_id)
            .await
            .map_err(|e| Rejection::new(Context::Like { film_id, user_id }, e))?;

        json(&film)
    }
}

pub async fn users(environment: Environment) -> RouteResult {
    timed! {
        let users = environment
            .users
            .all()
            .await
            .map_err(|e| Rejection::new(Context::Listing { collection: "users" }, e))?;

        json(&users)
    }
}

pub async fn user(environment: Environment, id: Id) -> RouteResult {
    timed! {
        let user = environment
            .users
            .find(id)
            .await
            .map_err(|e| Rejection::new(Context::User { id }, e))?;

        json(&user)
    }
}

pub async fn create_user(environment: Environment, payload: UserPayload) -> RouteResult {
    timed! {
        let user = environment
            .users
            .create(payload)
            .await
            .map_err(|e| Rejection::new(Context::UserSubmission { id: None }, e))?;

        with_status(json(&user), StatusCode::CREATED)
    }
}

pub async fn update_user(environment: Environment, payload: UserPayload) -> RouteResult {
    timed! {
        let id = payload.id;

        let user = environment
            .users
            .update(payload)
            .await
            .map_err(|e| Rejection::new(Context::UserSubmission { id }, e))?;

        json(&user)
    }
}

pub async fn delete_user(environment: Environment, id: Id) -> RouteResult {
    timed! {
        environment
            .users
            .delete(id)
            .await
            .map_err(|e| Rejection::new(Context::User { id }, e))?;

        StatusCode::NO_CONTENT
    }
}

pub async fn friends(environment: Environment, id: Id) -> RouteResult {
    timed! {
        let friends = environment
            .users
            .friends(id)
            .await
            .map_err(|e| Rejection::new(Context::User { id }, e))?;

        json(&friends)
    }
}

pub async fn common_friends(environment: Environment, user_id: Id, other_id: Id) -> RouteResult {
    timed! {
        let friends = environment
            .users
            .common_friends(user_id, other_id)
            .await
            .map_err(|e| Rejection::new(Context::CommonFriends { user_id, other_id }, e))?;

        json(&friends)
    }
}

pub async fn add_friend(environment: Environment, user_id: Id, friend_id: Id) -> RouteResult {
    timed! {
        environment
            .users
            .add_friend(user_id, friend_id)
            .await
            .map_err(|e| Rejection::new(Context::Friend { user_id, friend_id }, e))?;

        StatusCode::NO_CONTENT
    }
}

pub async fn delete_friend(environment: Environment, user_id: Id, friend_id: Id) -> RouteResult {
    timed! {
        environment
            .users
            .delete_friend(user_id, friend_id)
            .await
            .map_err(|e| Rejection::new(Context::Friend { user_id, friend_id }, e))?;

        StatusCode::NO_CONTENT
    }
}

pub async fn genres(environment: Environment) -> RouteResult {
    timed! {
        let genres = environment
            .catalog
            .genres()
            .await
            .map_err(|e| Rejection::new(Context::Listing { collection: "genres" }, e))?;

        json(&genres)
    }
}

pub async fn genre(environment: Environment, id: LabelId) -> RouteResult {
    timed! {
        let genre = environment
            .catalog
            .genre(id)
            .await
            .map_err(|e| Rejection::new(Context::Genre { id }, e))?;

        json(&genre)
    }
}

pub async fn mpa_ratings(environment: Environment) -> RouteResult {
    timed! {
        let ratings = environment
            .catalog
            .mpa_ratings()
            .await
            .map_err(|e| Rejection::new(Context::Listing { collection: "mpa" }, e))?;

        json(&ratings)
    }
}

pub async fn mpa_rating(environment: Environment, id: LabelId) -> RouteResult {
    timed! {
        let rating = environment
            .catalog
            .mpa_rating(id)
            .await
            .map_err(|e| Rejection::new(Context::MpaRating { id }, e))?;

        json(&rating)
    }
}

fn format_server_timing(elapsed: Duration) -> String {
    format!("handler;dur={}", elapsed.as_secs_f64() * 1000.0)
}
