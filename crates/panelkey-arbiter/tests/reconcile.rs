use keycombo::{Combo, Modifiers, keys};
use panelkey_arbiter::{
    Reconciler, SlotId, StartError, Status, Strategy, test_support::mock_arbitrator,
};
use settings::{
    DEFAULT_OVERLAY, DEFAULT_PANEL_FALLBACK, DEFAULT_PANEL_PRIMARY, HotkeySettings, HotkeySpec,
    MemoryStore, SettingsStore,
};

fn custom_overlay() -> Combo {
    Combo::new(keys::K, Modifiers::CONTROL | Modifiers::OPTION)
}

fn with_overlay(combo: Combo) -> HotkeySettings {
    HotkeySettings {
        overlay: Some(HotkeySpec::enabled(combo)),
        ..HotkeySettings::default()
    }
}

#[test]
fn defaults_come_up_clean() {
    let (mut arb, reg, _tap) = mock_arbitrator();
    let rec = Reconciler::new(MemoryStore::default());
    let (applied, report) = rec.reconcile(&mut arb).expect("reconcile");

    assert!(report.is_clean(), "{:?}", report.failures());
    assert_eq!(applied, HotkeySettings::default());
    assert_eq!(
        reg.live(),
        vec![
            (SlotId::PanelPrimary.id(), DEFAULT_PANEL_PRIMARY),
            (SlotId::PanelFallback.id(), DEFAULT_PANEL_FALLBACK),
            (SlotId::Overlay.id(), DEFAULT_OVERLAY),
        ]
    );
    assert_eq!(
        arb.current_status(),
        Status::Active(Strategy::ExclusiveRegistry)
    );
    assert!(rec.store().saves().is_empty());
}

#[test]
fn failing_overlay_reverts_to_default() {
    let (mut arb, reg, _tap) = mock_arbitrator();
    reg.occupy(custom_overlay());
    let rec = Reconciler::new(MemoryStore::new(with_overlay(custom_overlay())));

    let (applied, report) = rec.reconcile(&mut arb).expect("reconcile");

    // Fails under both strategies: taken, and the tap lacks permission.
    assert_eq!(report.overlay, Some(Err(StartError::Conflict)));
    assert_eq!(report.reverted, Some(Ok(Strategy::ExclusiveRegistry)));
    assert!(!report.is_clean());
    assert_eq!(report.failures().len(), 1);

    assert_eq!(applied.overlay_combo(), Some(DEFAULT_OVERLAY));
    assert_eq!(rec.store().current().overlay_combo(), Some(DEFAULT_OVERLAY));
    assert_eq!(rec.store().saves().len(), 1);
    assert_eq!(arb.overlay_combo(), Some(DEFAULT_OVERLAY));
    assert!(arb.current_status().is_active());
}

#[test]
fn failing_tap_fallback_also_reverts() {
    let (mut arb, reg, _tap) = mock_arbitrator();
    reg.occupy(custom_overlay());
    let mut settings = with_overlay(custom_overlay());
    settings.compatibility_mode = true;
    let rec = Reconciler::new(MemoryStore::new(settings));

    let (applied, report) = rec.reconcile(&mut arb).expect("reconcile");

    assert_eq!(report.overlay, Some(Err(StartError::PermissionDenied)));
    assert_eq!(report.reverted, Some(Ok(Strategy::ExclusiveRegistry)));
    assert_eq!(applied.overlay_combo(), Some(DEFAULT_OVERLAY));
    assert!(applied.compatibility_mode);
    assert!(arb.compatibility_mode());
}

#[test]
fn failing_default_is_not_reverted_again() {
    let (mut arb, reg, _tap) = mock_arbitrator();
    reg.occupy(DEFAULT_OVERLAY);
    let rec = Reconciler::new(MemoryStore::default());

    let (_, report) = rec.reconcile(&mut arb).expect("reconcile");

    assert_eq!(report.overlay, Some(Err(StartError::Conflict)));
    assert_eq!(report.reverted, None);
    assert!(rec.store().saves().is_empty());
    assert_eq!(arb.current_status(), Status::Conflict);
}

#[test]
fn tap_fallback_keeps_the_custom_combo() {
    let (mut arb, reg, tap) = mock_arbitrator();
    reg.occupy(custom_overlay());
    tap.set_authorized(true);
    let mut settings = with_overlay(custom_overlay());
    settings.compatibility_mode = true;
    let rec = Reconciler::new(MemoryStore::new(settings));

    let (applied, report) = rec.reconcile(&mut arb).expect("reconcile");

    assert!(report.is_clean());
    assert_eq!(applied.overlay_combo(), Some(custom_overlay()));
    assert_eq!(tap.armed(), Some(custom_overlay()));
    assert_eq!(arb.current_status(), Status::Active(Strategy::InputTap));
}

#[test]
fn reconcile_replaces_the_previous_configuration() {
    let (mut arb, reg, _tap) = mock_arbitrator();
    let rec = Reconciler::new(MemoryStore::default());
    rec.reconcile(&mut arb).expect("first");

    let mut next = HotkeySettings::default();
    next.toggle_fallback = None;
    next.quick_add_global = Some(HotkeySpec::enabled(Combo::new(
        keys::N,
        Modifiers::COMMAND | Modifiers::SHIFT,
    )));
    next.overlay = None;
    rec.store().save(&next);
    let (_, report) = rec.reconcile(&mut arb).expect("second");

    assert!(report.is_clean());
    assert_eq!(report.overlay, None);
    assert_eq!(
        reg.live(),
        vec![
            (SlotId::PanelPrimary.id(), DEFAULT_PANEL_PRIMARY),
            (
                SlotId::QuickAdd.id(),
                Combo::new(keys::N, Modifiers::COMMAND | Modifiers::SHIFT)
            ),
        ]
    );
    assert_eq!(arb.current_status(), Status::Inactive);
}

#[test]
fn slot_failures_are_reported_not_reverted() {
    let (mut arb, reg, _tap) = mock_arbitrator();
    reg.occupy(DEFAULT_PANEL_PRIMARY);
    let rec = Reconciler::new(MemoryStore::default());

    let (_, report) = rec.reconcile(&mut arb).expect("reconcile");

    assert_eq!(
        report.slot_failures,
        vec![(SlotId::PanelPrimary, StartError::Conflict)]
    );
    assert_eq!(report.failures(), vec![format!(
        "panel-primary: {}",
        StartError::Conflict
    )]);
    assert!(rec.store().saves().is_empty());
}

#[test]
fn swapped_panel_toggles_rebind_cleanly() {
    let (mut arb, reg, _tap) = mock_arbitrator();
    let rec = Reconciler::new(MemoryStore::default());
    rec.reconcile(&mut arb).expect("first");

    let mut next = HotkeySettings::default();
    next.toggle_primary = Some(HotkeySpec::enabled(DEFAULT_PANEL_FALLBACK));
    next.toggle_fallback = Some(HotkeySpec::enabled(DEFAULT_PANEL_PRIMARY));
    rec.store().save(&next);
    let (_, report) = rec.reconcile(&mut arb).expect("second");

    assert!(report.is_clean(), "{:?}", report.failures());
    assert_eq!(
        reg.live(),
        vec![
            (SlotId::PanelPrimary.id(), DEFAULT_PANEL_FALLBACK),
            (SlotId::PanelFallback.id(), DEFAULT_PANEL_PRIMARY),
            (SlotId::Overlay.id(), DEFAULT_OVERLAY),
        ]
    );
}

#[test]
fn combo_moving_from_a_slot_to_the_overlay_is_not_a_conflict() {
    let (mut arb, reg, _tap) = mock_arbitrator();
    let rec = Reconciler::new(MemoryStore::default());
    rec.reconcile(&mut arb).expect("first");

    let mut next = HotkeySettings::default();
    next.toggle_fallback = None;
    next.overlay = Some(HotkeySpec::enabled(DEFAULT_PANEL_FALLBACK));
    rec.store().save(&next);
    let (applied, report) = rec.reconcile(&mut arb).expect("second");

    assert!(report.is_clean(), "{:?}", report.failures());
    assert_eq!(report.reverted, None);
    assert_eq!(applied.overlay_combo(), Some(DEFAULT_PANEL_FALLBACK));
    assert_eq!(
        reg.live(),
        vec![
            (SlotId::PanelPrimary.id(), DEFAULT_PANEL_PRIMARY),
            (SlotId::Overlay.id(), DEFAULT_PANEL_FALLBACK),
        ]
    );
}
