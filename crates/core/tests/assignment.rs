use packsleuth_core::{
    parse_card_amount, AssignOutcome, Catalog, CatalogPack, Event, EventBus, SlotLabel, TrackError,
    Tracker,
};

fn pack(name: &str, family: &str, cards: &[(&str, u32)]) -> CatalogPack {
    let mut pack = CatalogPack::new(name, family);
    for (card, count) in cards {
        pack.add_card(card, *count);
    }
    pack
}

fn booster_catalog() -> Catalog {
    Catalog {
        packs: vec![
            pack("Booster 1", "Booster", &[("X", 2), ("Unique One", 1)]),
            pack("Booster 2", "Booster", &[("X", 2), ("Unique Two", 1)]),
        ],
    }
}

fn observe(tracker: &mut Tracker, card: &str) -> Vec<Event> {
    let mut events = EventBus::default();
    tracker.observe(card, 1, &mut events).expect("known card");
    events.drain().collect()
}

fn amount(tracker: &Tracker, pack_idx: usize, card: &str) -> u32 {
    tracker.catalog.packs[pack_idx]
        .card(card)
        .expect("card")
        .amount
}

#[test]
fn parse_card_amount_grammar() {
    assert_eq!(parse_card_amount("3x Ember Fox"), ("Ember Fox", 3));
    assert_eq!(parse_card_amount("Ember Fox"), ("Ember Fox", 1));
    assert_eq!(parse_card_amount("Box of Rocks"), ("Box of Rocks", 1));
    assert_eq!(parse_card_amount("12x 2x Nested"), ("2x Nested", 12));
    assert_eq!(parse_card_amount("x alone"), ("x alone", 1));
}

#[test]
fn shared_card_opens_one_ambiguous_slot() {
    let mut tracker = Tracker::new(booster_catalog(), None);
    let events = observe(&mut tracker, "X");

    assert_eq!(tracker.slots.len(), 1);
    assert_eq!(tracker.slots[0].candidates, vec![0, 1]);
    assert_eq!(amount(&tracker, 0, "X"), 1);
    assert_eq!(amount(&tracker, 1, "X"), 1);
    assert_eq!(
        events,
        vec![
            Event::SlotOpened {
                slot: 0,
                label: SlotLabel::Family("Booster".to_string()),
                possibilities: 2,
            },
            Event::CardAssigned {
                card: "X".to_string(),
                slot: 0,
                label: SlotLabel::Family("Booster".to_string()),
            },
        ]
    );
}

#[test]
fn unique_card_differentiates_the_slot() {
    let mut tracker = Tracker::new(booster_catalog(), None);
    observe(&mut tracker, "X");
    let events = observe(&mut tracker, "Unique One");

    assert_eq!(tracker.slots[0].candidates, vec![0]);
    assert_eq!(amount(&tracker, 0, "Unique One"), 1);
    assert_eq!(
        events[0],
        Event::SlotNarrowed {
            slot: 0,
            was: SlotLabel::Family("Booster".to_string()),
            now: SlotLabel::Exact("Booster 1".to_string()),
            from: 2,
            to: 1,
        }
    );
    assert_eq!(
        events[1],
        Event::CardAssigned {
            card: "Unique One".to_string(),
            slot: 0,
            label: SlotLabel::Exact("Booster 1".to_string()),
        }
    );
}

#[test]
fn assignment_outcomes_follow_strategy_order() {
    let mut tracker = Tracker::new(booster_catalog(), None);
    let mut events = EventBus::default();

    // New slot, then extension of the ambiguous slot, then differentiation.
    assert_eq!(tracker.assign("X", &mut events), AssignOutcome::Update);
    assert_eq!(tracker.assign("X", &mut events), AssignOutcome::NoUpdate);
    assert_eq!(
        tracker.assign("Unique One", &mut events),
        AssignOutcome::Update
    );
}

#[test]
fn reached_bound_blocks_new_slots() {
    let catalog = Catalog {
        packs: vec![
            pack("Solo", "Solo", &[("Y", 2)]),
            pack("Other", "Other", &[("Z", 1)]),
        ],
    };
    let mut tracker = Tracker::new(catalog, Some(1));
    tracker.seed_slot("Solo").expect("seed");

    let mut events = EventBus::default();
    assert_eq!(tracker.assign("Z", &mut events), AssignOutcome::Unassigned);
    observe(&mut tracker, "Z");
    assert_eq!(tracker.unassigned, vec!["Z".to_string()]);
    assert_eq!(tracker.slots.len(), 1);
}

#[test]
fn copies_beyond_max_amount_fall_to_the_pool() {
    let catalog = Catalog {
        packs: vec![pack("Solo", "Solo", &[("Y", 2)])],
    };
    let mut tracker = Tracker::new(catalog, None);
    let mut events = EventBus::default();
    tracker.observe("Y", 3, &mut events).expect("known card");

    assert_eq!(tracker.slots.len(), 1);
    assert_eq!(amount(&tracker, 0, "Y"), 2);
    assert_eq!(tracker.unassigned, vec!["Y".to_string()]);
    let drained: Vec<Event> = events.drain().collect();
    assert!(drained.contains(&Event::CardUnassigned {
        card: "Y".to_string(),
        pending: 1,
    }));
}

#[test]
fn counters_stay_within_bounds() {
    let mut tracker = Tracker::new(booster_catalog(), None);
    let mut events = EventBus::default();
    for card in ["X", "X", "X", "Unique One", "Unique One"] {
        let _ = tracker.observe(card, 1, &mut events);
        for pack in &tracker.catalog.packs {
            for card in &pack.cards {
                assert!(card.amount <= card.max_amount);
            }
        }
    }
}

#[test]
fn candidate_counts_shrink_monotonically() {
    let mut tracker = Tracker::new(booster_catalog(), None);
    let mut counts: Vec<usize> = Vec::new();
    for card in ["X", "Unique One", "X"] {
        observe(&mut tracker, card);
        counts.push(tracker.slots[0].candidates.len());
    }
    assert!(counts.windows(2).all(|pair| pair[1] <= pair[0]));
    assert!(counts.iter().all(|&count| count >= 1));
}

#[test]
fn cross_slot_ambiguity_pools_the_card_until_resolution() {
    let catalog = Catalog {
        packs: vec![
            pack("Spring 1", "Spring", &[("A", 1), ("C", 1)]),
            pack("Spring 2", "Spring", &[("B", 1), ("C", 1), ("E", 1)]),
            pack("Autumn 1", "Autumn", &[("A", 1), ("D", 1)]),
            pack("Autumn 2", "Autumn", &[("B", 1), ("D", 1)]),
        ],
    };
    let mut tracker = Tracker::new(catalog, Some(2));

    observe(&mut tracker, "C");
    observe(&mut tracker, "D");
    assert_eq!(tracker.slots.len(), 2);

    // A has headroom in candidates of both slots: differentiation refuses to
    // guess, and the bound blocks a third slot.
    let events = observe(&mut tracker, "A");
    assert_eq!(
        events,
        vec![Event::CardUnassigned {
            card: "A".to_string(),
            pending: 1,
        }]
    );
    assert_eq!(tracker.unassigned, vec!["A".to_string()]);

    // E pins the first slot to Spring 2; the cascade then replays A, which
    // now differentiates the second slot down to Autumn 1.
    let events = observe(&mut tracker, "E");
    assert_eq!(tracker.slots[0].candidates, vec![1]);
    assert_eq!(tracker.slots[1].candidates, vec![2]);
    assert!(tracker.unassigned.is_empty());
    assert_eq!(amount(&tracker, 2, "A"), 1);
    let narrowed: Vec<&Event> = events
        .iter()
        .filter(|event| matches!(event, Event::SlotNarrowed { .. }))
        .collect();
    assert_eq!(narrowed.len(), 2);
}

#[test]
fn unclaimed_pack_blocks_differentiation_and_extension_blocks_new_slot() {
    let catalog = Catalog {
        packs: vec![
            pack("Booster 1", "Booster", &[("X", 2), ("Unique One", 1)]),
            pack("Booster 2", "Booster", &[("X", 2), ("Unique Two", 1)]),
            pack("Promo", "Promo", &[("Unique One", 1)]),
        ],
    };
    let mut tracker = Tracker::new(catalog, None);
    observe(&mut tracker, "X");

    // "Unique One" could extend the ambiguous slot's Booster 1 (veto for a new
    // slot) and could open the unclaimed Promo (refusal to differentiate), so
    // it must wait in the pool.
    let events = observe(&mut tracker, "Unique One");
    assert_eq!(
        events,
        vec![Event::CardUnassigned {
            card: "Unique One".to_string(),
            pending: 1,
        }]
    );
    assert_eq!(tracker.slots.len(), 1);
    assert_eq!(tracker.slots[0].candidates.len(), 2);
}

#[test]
fn seeded_slot_differentiates_at_bound() {
    let mut tracker = Tracker::new(booster_catalog(), Some(1));
    let slot = tracker.seed_slot("Booster").expect("seed");
    assert_eq!(tracker.slots[slot].candidates, vec![0, 1]);
    assert_eq!(
        tracker.slot_label(slot),
        SlotLabel::Family("Booster".to_string())
    );

    observe(&mut tracker, "Unique One");
    assert_eq!(tracker.slots[slot].candidates, vec![0]);
    assert_eq!(
        tracker.slot_label(slot),
        SlotLabel::Exact("Booster 1".to_string())
    );
}

#[test]
fn seeding_an_unknown_family_fails() {
    let mut tracker = Tracker::new(booster_catalog(), Some(1));
    let err = tracker.seed_slot("Starter").expect_err("must fail");
    assert!(matches!(err, TrackError::UnknownFamily(name) if name == "Starter"));
    assert!(tracker.slots.is_empty());
}

#[test]
fn observing_an_unknown_card_fails_without_mutation() {
    let mut tracker = Tracker::new(booster_catalog(), None);
    let mut events = EventBus::default();
    let err = tracker
        .observe("Missing", 1, &mut events)
        .expect_err("must fail");
    assert!(matches!(err, TrackError::UnknownCard(name) if name == "Missing"));
    assert!(tracker.slots.is_empty());
    assert!(tracker.unassigned.is_empty());
    assert_eq!(events.drain().count(), 0);
}

#[test]
fn claimed_packs_never_form_a_second_slot() {
    let catalog = Catalog {
        packs: vec![
            pack("Promo 1", "Promo", &[("W", 1)]),
            pack("Promo 2", "Promo", &[("W", 1)]),
        ],
    };
    let mut tracker = Tracker::new(catalog, None);
    observe(&mut tracker, "W");
    assert_eq!(tracker.slots.len(), 1);

    // Both packs are claimed by the first slot and out of headroom, so a
    // second W has nowhere to go.
    observe(&mut tracker, "W");
    assert_eq!(tracker.slots.len(), 1);
    assert_eq!(tracker.unassigned, vec!["W".to_string()]);
}

#[test]
fn multi_unit_observation_is_unit_by_unit() {
    let mut tracker = Tracker::new(booster_catalog(), None);
    let mut events = EventBus::default();
    tracker.observe("X", 2, &mut events).expect("known card");

    assert_eq!(tracker.slots.len(), 1);
    assert_eq!(amount(&tracker, 0, "X"), 2);
    assert_eq!(amount(&tracker, 1, "X"), 2);
}

#[test]
fn duplicate_family_seeds_share_candidates() {
    let mut tracker = Tracker::new(booster_catalog(), Some(2));
    tracker.seed_slot("Booster").expect("seed");
    tracker.seed_slot("Booster").expect("seed");
    assert_eq!(tracker.slots[0].candidates, tracker.slots[1].candidates);

    // A unique card now has headroom in candidates of both slots, which is
    // the cross-slot refusal case.
    let mut events = EventBus::default();
    assert_eq!(
        tracker.assign("Unique One", &mut events),
        AssignOutcome::Unassigned
    );
}
