use summarist_gate::models::{
    AccessRequirement, Book, Decision, Effect, ModalMode, ModalState, SubscriptionTier, Target,
};

#[test]
fn test_subscription_tier_wire_names() {
    assert_eq!(
        serde_json::to_string(&SubscriptionTier::PremiumPlus).unwrap(),
        "\"premium-plus\""
    );
    assert_eq!(
        serde_json::from_str::<SubscriptionTier>("\"basic\"").unwrap(),
        SubscriptionTier::Basic
    );
}

#[test]
fn test_subscription_tier_parsing() {
    assert_eq!("Premium".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::Premium);
    assert_eq!(
        " PREMIUM_PLUS ".parse::<SubscriptionTier>().unwrap(),
        SubscriptionTier::PremiumPlus
    );
    assert!("gold".parse::<SubscriptionTier>().is_err());
    assert!("".parse::<SubscriptionTier>().is_err());
}

#[test]
fn test_book_deserializes_from_catalog_json() {
    let book: Book = serde_json::from_value(serde_json::json!({
        "id": "f9gy1gpai8",
        "title": "The 7 Habits of Highly Effective People",
        "author": "Stephen R. Covey",
        "subTitle": "Powerful Lessons in Personal Change",
        "imageLink": "https://cdn.example.com/7habits.png",
        "audioLink": "https://cdn.example.com/7habits.mp3",
        "subscriptionRequired": true
    }))
    .unwrap();

    let item = book.content_item();
    assert_eq!(item.access, AccessRequirement::SubscriptionRequired);
    assert_eq!(item.secondary_target, Some(Target::new("/player/f9gy1gpai8")));
}

#[test]
fn test_blank_audio_link_has_no_player() {
    let book = Book {
        id: "x".to_string(),
        audio_link: Some("  ".to_string()),
        ..Book::default()
    };
    let item = book.content_item();
    assert_eq!(item.access, AccessRequirement::Free);
    assert!(item.secondary_target.is_none());
}

#[test]
fn test_effect_for_each_decision() {
    let upgrade = Target::new("/choose-plan");

    assert_eq!(
        Effect::for_decision(&Decision::RequireAuth, &upgrade),
        Effect::OpenModal {
            mode: ModalMode::Login
        }
    );
    assert_eq!(
        Effect::for_decision(&Decision::RequireUpgrade, &upgrade),
        Effect::Navigate {
            target: upgrade.clone()
        }
    );
    let book = Target::new("/book/1");
    assert_eq!(
        Effect::for_decision(&Decision::Allow { target: book.clone() }, &upgrade),
        Effect::Navigate { target: book }
    );
}

#[test]
fn test_modal_state_from_mode() {
    assert_eq!(ModalState::from(ModalMode::Signup), ModalState::Signup);
    assert!(ModalState::from(ModalMode::Login).is_open());
    assert!(!ModalState::Closed.is_open());
}
