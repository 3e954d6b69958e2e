use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::*;

fn no_paint(_: &View, _: (u32, u32), _: &FocusManager) -> (Scene, Vec<HitRegion>, Vec<SemNode>) {
    (Scene::default(), vec![], vec![])
}

fn focusable(ids: &[u64]) -> Vec<HitRegion> {
    ids.iter()
        .map(|&id| HitRegion {
            id,
            focusable: true,
            ..Default::default()
        })
        .collect()
}

#[test]
fn test_signal_basic() {
    let sig = signal(42);
    assert_eq!(sig.get(), 42);

    sig.set(100);
    assert_eq!(sig.get(), 100);

    sig.update(|v| *v += 1);
    assert_eq!(sig.get(), 101);
}

#[test]
fn test_signal_subscriber_can_read() {
    let sig = signal(0);
    let seen = Rc::new(Cell::new(-1));

    let (s, sig2) = (seen.clone(), sig.clone());
    sig.subscribe(move |v| {
        assert_eq!(sig2.get(), *v);
        s.set(*v);
    });

    sig.set(42);
    assert_eq!(seen.get(), 42);
}

#[test]
fn test_scope_explicit_dispose() {
    let cleaned_up = Rc::new(Cell::new(0));

    let scope = Scope::new();
    let c = cleaned_up.clone();
    scope.add_disposer(move || c.set(c.get() + 1));

    assert_eq!(cleaned_up.get(), 0);
    scope.clone().dispose();
    assert_eq!(cleaned_up.get(), 1);
    scope.clone().dispose();
    assert_eq!(cleaned_up.get(), 1);
    assert!(scope.is_disposed());

    // Late registration runs right away.
    let c = cleaned_up.clone();
    scope.add_disposer(move || c.set(c.get() + 10));
    assert_eq!(cleaned_up.get(), 11);
}

#[test]
fn test_scope_children_first() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let parent = Scope::new();
    let child = parent.child();

    let o = order.clone();
    parent.add_disposer(move || o.borrow_mut().push("parent"));
    let o = order.clone();
    child.add_disposer(move || o.borrow_mut().push("child"));

    parent.dispose();
    assert_eq!(*order.borrow(), vec!["child", "parent"]);
}

#[test]
fn test_dispose_runs_once() {
    let n = Rc::new(Cell::new(0));
    let c = n.clone();
    let d = Dispose::new(move || c.set(c.get() + 1));
    let d2 = d.clone();
    d.run();
    d2.run();
    d.run();
    assert_eq!(n.get(), 1);
    assert!(d.is_spent());
}

#[test]
fn test_key_based_remember() {
    Composer::reset();

    let val1 = remember_with_key("test", || 42);
    let val2 = remember_with_key("test", || 100);

    assert_eq!(*val1, 42);
    assert_eq!(*val2, 42); // Not 100, because key exists
}

#[test]
fn test_remember_stable_until_unmount() {
    let mut sched = Scheduler::new();
    let mut ptrs = Vec::new();
    for _ in 0..3 {
        sched.compose(
            Instant::now(),
            |_| {
                let s = remember(|| RefCell::new(String::new()));
                ptrs.push(Rc::as_ptr(&s) as usize);
                View::new(0, ViewKind::Box)
            },
            no_paint,
        );
    }
    assert!(ptrs.windows(2).all(|w| w[0] == w[1]));

    sched.unmount();
    assert_eq!(Composer::slot_count(), 0);

    let mut value = String::from("stale");
    sched.compose(
        Instant::now(),
        |_| {
            let s = remember_state(|| String::new());
            value = s.borrow().clone();
            View::new(0, ViewKind::Box)
        },
        no_paint,
    );
    assert_eq!(value, "");
}

#[test]
fn test_disposable_effect_keyed() {
    let log = Rc::new(RefCell::new(Vec::<String>::new()));
    let mut sched = Scheduler::new();

    let compose_with = |sched: &mut Scheduler, key: u32| {
        let log = log.clone();
        sched.compose(
            Instant::now(),
            move |_| {
                let log = log.clone();
                disposable_effect(key, || {
                    log.borrow_mut().push(format!("start {key}"));
                    on_unmount(move || log.borrow_mut().push(format!("stop {key}")))
                });
                View::new(0, ViewKind::Box)
            },
            no_paint,
        );
    };

    compose_with(&mut sched, 1);
    compose_with(&mut sched, 1);
    assert_eq!(*log.borrow(), vec!["start 1"]);

    compose_with(&mut sched, 2);
    assert_eq!(*log.borrow(), vec!["start 1", "stop 1", "start 2"]);

    sched.unmount();
    sched.unmount();
    assert_eq!(
        *log.borrow(),
        vec!["start 1", "stop 1", "start 2", "stop 2"]
    );
}

#[test]
fn test_drop_unmounts() {
    let stopped = Rc::new(Cell::new(false));
    {
        let mut sched = Scheduler::new();
        let s = stopped.clone();
        sched.compose(
            Instant::now(),
            move |_| {
                let s = s.clone();
                scoped_effect(move || on_unmount(move || s.set(true)));
                View::new(0, ViewKind::Box)
            },
            no_paint,
        );
        assert!(sched.is_mounted());
        assert!(!stopped.get());
    }
    assert!(stopped.get());
}

#[test]
fn test_focus_manager_is_local_during_compose() {
    let mut sched = Scheduler::new();
    let captured = Rc::new(RefCell::new(None::<FocusManager>));
    let c = captured.clone();
    sched.compose(
        Instant::now(),
        move |_| {
            *c.borrow_mut() = Some(local_focus_manager());
            View::new(0, ViewKind::Box)
        },
        |_, _, _| (Scene::default(), focusable(&[4, 8]), vec![]),
    );
    let fm = captured.borrow().clone().unwrap();
    assert!(fm.ptr_eq(sched.focus_manager()));
    assert_eq!(fm.focus_chain(), vec![4, 8]);

    fm.request(8);
    assert_eq!(sched.focused(), Some(8));
    sched.unmount();
    assert_eq!(sched.focused(), None);
}

#[test]
fn test_frame_time_is_explicit() {
    let mut sched = Scheduler::new();
    let t0 = Instant::now() + Duration::from_secs(60);
    let mut seen = None;
    sched.compose(
        t0,
        |_| {
            seen = Some(frame_time());
            View::new(0, ViewKind::Box)
        },
        no_paint,
    );
    assert_eq!(seen, Some(t0));
    assert_eq!(frame_time(), t0);
}

#[test]
fn test_color_from_hex() {
    let c = Color::from_hex("#FF5733");
    assert_eq!(c, Color(255, 87, 51, 255));

    let c_alpha = Color::from_hex("#FF5733AA");
    assert_eq!(c_alpha, Color(255, 87, 51, 170));

    assert_eq!(Color::WHITE.copy_alpha(0.3), Color(255, 255, 255, 77));
}

#[test]
fn test_rect_contains() {
    let rect = Rect {
        x: 10.0,
        y: 10.0,
        w: 100.0,
        h: 50.0,
    };

    assert!(rect.contains(Vec2 { x: 50.0, y: 30.0 }));
    assert!(!rect.contains(Vec2 { x: 5.0, y: 30.0 }));
    assert!(!rect.contains(Vec2 { x: 50.0, y: 70.0 }));
}

#[test]
fn test_password_transformation() {
    let vt = VisualTransformation::password();
    assert_eq!(vt.filter("héllo"), "•••••");
    assert_eq!(vt.filter(""), "");
    assert_eq!(vt.filter("  "), "••");
    // 'é' is two bytes; the mask is three.
    assert_eq!(vt.original_to_transformed("héllo", 3), 6);
    assert_eq!(vt.transformed_to_original("héllo", 6), 3);
    assert_eq!(VisualTransformation::None.filter("alice"), "alice");
}

#[test]
fn test_keyboard_actions_dispatch() {
    let hit = Rc::new(Cell::new(false));
    let h = hit.clone();
    let actions = KeyboardActions::new().on_done(move || h.set(true));
    assert!(!actions.run(ImeAction::Next));
    assert!(actions.run(ImeAction::Done));
    assert!(hit.get());
}

#[test]
fn test_theme_override_restores() {
    let base = theme();
    let custom = Theme {
        surface: Color::DARK_GRAY,
        ..Theme::default()
    };
    with_theme(custom, || {
        assert_eq!(theme().surface, Color::DARK_GRAY);
    });
    assert_eq!(theme(), base);
}
