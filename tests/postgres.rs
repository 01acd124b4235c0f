//! Runs the storage contract against a live database. Set
//! `BACKEND_TEST_DB_CONNECTION_STRING` to a database migrated by
//! `initdb`; the test is skipped otherwise. Each run works on fresh
//! rows, so the database need not be empty.

use std::env;
use std::sync::Arc;

use time::macros::date;

use reelgraph::db::{Db, PgDb};
use reelgraph::errors::BackendError;
use reelgraph::film::{FilmFields, FilmPatch};
use reelgraph::user::{UserFields, UserPatch};
use reelgraph::Id;

async fn connect() -> Option<Arc<dyn Db>> {
    dotenv::dotenv().ok();

    let connection_string = match env::var("BACKEND_TEST_DB_CONNECTION_STRING") {
        Ok(s) => s,
        Err(_) => {
            eprintln!("BACKEND_TEST_DB_CONNECTION_STRING not set; skipping");
            return None;
        }
    };

    let pool = sqlx::PgPool::connect(&connection_string)
        .await
        .expect("create database pool");

    Some(Arc::new(PgDb::new(pool)))
}

fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("get current time")
        .as_nanos();

    format!("{}{}", prefix, nanos)
}

fn film(name: &str, genre_ids: Vec<i16>) -> FilmFields {
    FilmFields {
        name: name.to_owned(),
        description: None,
        release_date: date!(2001 - 09 - 11),
        duration: 95,
        mpa_id: 3,
        genre_ids,
    }
}

async fn add_user(db: &Arc<dyn Db>) -> Id {
    let login = unique("user");

    db.insert_user(UserFields {
        email: format!("{}@example.com", login),
        name: login.clone(),
        login,
        birthday: date!(1979 - 02 - 14),
    })
    .await
    .expect("insert user")
}

#[tokio::test]
async fn storage_contract_holds() {
    let db = match connect().await {
        Some(db) => db,
        None => return,
    };

    test_vocabularies(&db).await;
    test_films(&db).await;
    test_users(&db).await;
}

async fn test_vocabularies(db: &Arc<dyn Db>) {
    let ratings = db.mpa_ratings().await.expect("list MPA ratings");
    assert_eq!(ratings.len(), 5);
    assert_eq!(ratings[2].name, "PG-13");

    assert!(db.genre(0).await.expect("look up genre").is_none());
    assert_eq!(
        db.mpa_rating(5).await.expect("look up rating").map(|r| r.name),
        Some("NC-17".to_owned())
    );
}

async fn test_films(db: &Arc<dyn Db>) {
    let id = db
        .insert_film(film("Contract", vec![1, 4]))
        .await
        .expect("insert film");

    let stored = db.film(id).await.expect("get film").expect("film exists");
    assert_eq!(stored.name, "Contract");
    assert_eq!(stored.mpa.name, "PG-13");
    assert_eq!(stored.likes_count, 0);

    let genres = db.genres_for_films(&[id]).await.expect("get genres");
    assert_eq!(
        genres[&id].iter().map(|g| g.id).collect::<Vec<_>>(),
        vec![1, 4]
    );

    assert!(db
        .update_film(
            id,
            FilmPatch {
                name: Some("Contract II".to_owned()),
                ..FilmPatch::default()
            }
        )
        .await
        .expect("rename film"));

    let renamed = db.film(id).await.expect("get film").expect("film exists");
    assert_eq!(renamed.name, "Contract II");
    assert_eq!(renamed.duration, stored.duration);
    assert_eq!(
        db.genres_for_films(&[id]).await.expect("get genres")[&id].len(),
        2
    );

    assert!(db
        .update_film(
            id,
            FilmPatch {
                genre_ids: Some(vec![]),
                ..FilmPatch::default()
            }
        )
        .await
        .expect("clear genres"));
    assert!(!db
        .genres_for_films(&[id])
        .await
        .expect("get genres")
        .contains_key(&id));
    assert!(!db
        .update_film(-1, FilmPatch::default())
        .await
        .expect("update missing film"));

    assert!(matches!(
        db.insert_film(FilmFields {
            mpa_id: 99,
            ..film("Unrated", vec![])
        })
        .await,
        Err(BackendError::MpaNotFound(99))
    ));

    let user = add_user(db).await;
    assert!(db.insert_like(id, user).await.expect("like"));
    assert!(!db.insert_like(id, user).await.expect("like again"));
    assert_eq!(db.film(id).await.unwrap().unwrap().likes_count, 1);

    let popular = db.popular_films(1).await.expect("get popular films");
    assert_eq!(popular.len(), 1);

    assert!(db.delete_film(id).await.expect("delete film"));
    assert!(!db.delete_like(id, user).await.expect("unlike deleted film"));
    assert!(!db.delete_film(id).await.expect("delete film again"));
}

async fn test_users(db: &Arc<dyn Db>) {
    let a = add_user(db).await;
    let b = add_user(db).await;
    let c = add_user(db).await;

    let a_user = db.user(a).await.expect("get user").expect("user exists");
    assert_eq!(
        db.user_id_by_email(&a_user.email).await.expect("find by email"),
        Some(a)
    );

    assert!(matches!(
        db.insert_user(UserFields {
            login: unique("dup"),
            ..UserFields::from_user(&a_user)
        })
        .await,
        Err(BackendError::EmailAlreadyExists(_))
    ));
    assert!(matches!(
        db.update_user(
            b,
            UserPatch {
                email: Some(a_user.email.clone()),
                ..UserPatch::default()
            }
        )
        .await,
        Err(BackendError::EmailAlreadyExists(_))
    ));

    assert!(db
        .update_user(
            a,
            UserPatch {
                login: Some(format!("{}x", a_user.login)),
                name: Some(String::new()),
                ..UserPatch::default()
            }
        )
        .await
        .expect("change login and reset name"));
    let reset = db.user(a).await.expect("get user").expect("user exists");
    assert_eq!(reset.name, format!("{}x", a_user.login));
    assert_eq!(reset.email, a_user.email);
    assert_eq!(reset.birthday, a_user.birthday);

    db.insert_friendship(a, c).await.expect("befriend");
    db.insert_friendship(b, c).await.expect("befriend");
    db.insert_friendship(c, a).await.expect("befriend again");

    let friends = db.friends(c).await.expect("list friends");
    assert_eq!(friends.iter().map(|u| u.id).collect::<Vec<_>>(), vec![a, b]);

    let common = db.common_friends(a, b).await.expect("list common friends");
    assert_eq!(common.iter().map(|u| u.id).collect::<Vec<_>>(), vec![c]);

    db.delete_friendship(c, a).await.expect("unfriend");
    assert!(db.friends(a).await.expect("list friends").is_empty());

    assert!(db.delete_user(c).await.expect("delete user"));
    assert!(db.friends(b).await.expect("list friends").is_empty());

    for id in &[a, b] {
        db.delete_user(*id).await.expect("clean up user");
    }
}
