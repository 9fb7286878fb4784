//! Behaviour every repository adapter must share, checked through the port
//! traits so any backend can be run against the same assertions. Owners and
//! authors are real user rows, since relational backends enforce the
//! foreign keys.
#![allow(dead_code)]

use chrono::Utc;
use domains::{
    CareLevel, Comment, CommentRepository, LightNeeds, Plant, PlantCategory, PlantFilter,
    PlantRepository, PlantSize, Rating, RatingRepository, Reassign, User, UserRepository,
    WaterNeeds, WishListRepository,
};
use uuid::Uuid;

pub fn plant(name: &str) -> Plant {
    Plant {
        id: Uuid::new_v4(),
        name: name.into(),
        description: "d".into(),
        tips: "t".into(),
        light_needs: LightNeeds::BrightIndirect,
        water_needs: WaterNeeds::Low,
        care: CareLevel::Easy,
        air_purifying: false,
        allergenic: false,
        size: PlantSize::Small,
        blooms: true,
        category: PlantCategory::Succulent,
        created_at: Utc::now(),
    }
}

pub fn user(email: &str, username: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.into(),
        username: username.into(),
        password_hash: "x".into(),
        is_staff: false,
        created_at: Utc::now(),
    }
}

/// Inserts a fresh user and returns its id.
pub async fn member(users: &dyn UserRepository) -> Uuid {
    let tag = Uuid::new_v4().simple().to_string();
    let u = user(&format!("{tag}@example.com"), &tag);
    assert!(users.insert(&u).await.unwrap());
    u.id
}

pub async fn wishlist_contract(
    users: &dyn UserRepository,
    plants: &dyn PlantRepository,
    wishlists: &dyn WishListRepository,
) {
    let a = plant("A");
    let b = plant("B");
    plants.insert(&a).await.unwrap();
    plants.insert(&b).await.unwrap();
    let owner = member(users).await;
    let stranger = member(users).await;

    let (first, created) = wishlists.get_or_create(owner, a.id).await.unwrap();
    assert!(created);
    let (again, created) = wishlists.get_or_create(owner, a.id).await.unwrap();
    assert!(!created);
    assert_eq!(first.id, again.id);

    let (second, _) = wishlists.get_or_create(owner, b.id).await.unwrap();
    assert_eq!(
        wishlists.reassign(owner, second.id, a.id).await.unwrap(),
        Reassign::Duplicate
    );
    assert_eq!(
        wishlists.reassign(stranger, second.id, a.id).await.unwrap(),
        Reassign::Missing
    );
    assert!(wishlists.find_for_user(stranger, first.id).await.unwrap().is_none());
    assert!(wishlists.delete_for_user(owner, first.id).await.unwrap());

    // The freed pair can be taken again.
    let (_, created) = wishlists.get_or_create(owner, a.id).await.unwrap();
    assert!(created);
}

pub async fn comment_contract(
    users: &dyn UserRepository,
    plants: &dyn PlantRepository,
    comments: &dyn CommentRepository,
) {
    let p = plant("Host");
    plants.insert(&p).await.unwrap();
    let author = member(users).await;
    let mk = |parent: Option<Uuid>| Comment {
        id: Uuid::new_v4(),
        plant_id: p.id,
        author_id: author,
        author_name: "a".into(),
        parent_id: parent,
        text: "t".into(),
        image: None,
        created_at: Utc::now(),
    };
    let root = mk(None);
    let child = mk(Some(root.id));
    let leaf = mk(Some(child.id));
    for c in [&root, &child, &leaf] {
        comments.insert(c).await.unwrap();
    }

    assert_eq!(comments.count_replies(root.id).await.unwrap(), 1);
    assert_eq!(comments.top_level(p.id).await.unwrap().len(), 1);

    let removed = comments.delete(child.id).await.unwrap();
    let mut ids: Vec<_> = removed.iter().map(|c| c.id).collect();
    ids.sort();
    let mut expected = vec![child.id, leaf.id];
    expected.sort();
    assert_eq!(ids, expected);
    assert_eq!(comments.list(Some(p.id)).await.unwrap().len(), 1);
    assert!(comments.delete(Uuid::new_v4()).await.unwrap().is_empty());
}

pub async fn rating_contract(
    users: &dyn UserRepository,
    plants: &dyn PlantRepository,
    ratings: &dyn RatingRepository,
) {
    let p = plant("Rated");
    plants.insert(&p).await.unwrap();
    let rater = member(users).await;
    let rating = |value| Rating {
        id: Uuid::new_v4(),
        plant_id: p.id,
        user_id: rater,
        rating: value,
        created_at: Utc::now(),
    };

    assert!(ratings.insert_unique(&rating(3)).await.unwrap());
    assert!(!ratings.insert_unique(&rating(5)).await.unwrap());
    assert_eq!(ratings.values_for_plant(p.id).await.unwrap(), vec![3]);

    assert!(plants.delete(p.id).await.unwrap());
    assert!(ratings.values_for_plant(p.id).await.unwrap().is_empty());
}

pub async fn user_contract(users: &dyn UserRepository) {
    let first = user("a@example.com", "alpha");
    assert!(users.insert(&first).await.unwrap());
    assert!(!users.insert(&user("a@example.com", "beta")).await.unwrap());
    assert!(!users.insert(&user("b@example.com", "alpha")).await.unwrap());
    assert_eq!(
        users.find_by_email("a@example.com").await.unwrap().map(|u| u.id),
        Some(first.id)
    );
    assert!(users.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

/// Expects an empty plant table.
pub async fn plant_order_contract(plants: &dyn PlantRepository) {
    for name in ["cactus", "Basil", "aloe", "Aloe"] {
        plants.insert(&plant(name)).await.unwrap();
    }
    let names: Vec<String> = plants
        .list(&PlantFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Aloe", "aloe", "Basil", "cactus"]);
}
