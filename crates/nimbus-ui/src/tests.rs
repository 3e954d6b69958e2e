use super::*;
use std::sync::Arc;

fn paint(root: &View, states: &mut TextFieldStates, fm: &FocusManager) -> (Scene, Vec<HitRegion>, Vec<SemNode>) {
    layout_and_paint(root, (400, 800), states, &Interactions::default(), fm)
}

fn form(user: &str, pass: &str, requester: Option<FocusRequester>) -> View {
    let mut pw = TextField("password", pass, Modifier::new().fill_max_width(), |_| {})
        .visual_transformation(VisualTransformation::password());
    if let Some(r) = requester {
        pw.modifier = pw.modifier.focus_requester(r);
    }
    Column(Modifier::new().fill_max_size().padding(24.0).gap(16.0)).child((
        TextField("username", user, Modifier::new().fill_max_width(), |_| {}),
        pw,
        Button("SIGN IN", || {}).modifier(Modifier::new().fill_max_width()),
    ))
}

#[test]
fn semantics_outline_masks_password() {
    let mut states = TextFieldStates::new();
    let (_, _, sems) = paint(&form("alice", "secret", None), &mut states, &FocusManager::new());
    let outline = sems
        .iter()
        .map(|s| format!("{:?} {:?} {:?}", s.role, s.label, s.value))
        .collect::<Vec<_>>()
        .join("\n");
    insta::assert_snapshot!(outline, @r###"
    TextField Some("username") Some("alice")
    TextField Some("password") Some("••••••")
    Button Some("SIGN IN") None
    "###);
}

#[test]
fn focus_chain_follows_tree_order() {
    let mut states = TextFieldStates::new();
    let (_, hits, _) = paint(&form("", "", None), &mut states, &FocusManager::new());
    let focusable: Vec<_> = hits.iter().filter(|h| h.focusable).collect();
    assert_eq!(focusable.len(), 3);
    assert_eq!(focusable[0].ime_action, ImeAction::Default);
    assert!(focusable[0].is_text_field());
    assert!(focusable[1].is_text_field());
    assert!(focusable[2].on_click.is_some());
    assert!(focusable[0].rect.y < focusable[1].rect.y);
}

#[test]
fn requester_binds_to_its_field() {
    let fm = FocusManager::new();
    let r = FocusRequester::new();
    let mut states = TextFieldStates::new();
    let (_, hits, sems) = paint(&form("", "", Some(r.clone())), &mut states, &fm);

    let pw = sems
        .iter()
        .find(|s| s.label.as_deref() == Some("password"))
        .unwrap();
    assert_eq!(r.target(), Some(pw.id));
    assert!(r.request_focus());
    assert_eq!(fm.focused(), Some(pw.id));
    assert!(hits.iter().any(|h| h.id == pw.id && h.transformation != VisualTransformation::None));
}

#[test]
fn field_state_follows_composed_value() {
    let mut states = TextFieldStates::new();
    let fm = FocusManager::new();
    paint(&form("al", "", None), &mut states, &fm);
    assert_eq!(states.len(), 2);
    let texts: Vec<String> = {
        let mut v: Vec<_> = states.values().map(|s| s.borrow().text.clone()).collect();
        v.sort();
        v
    };
    assert_eq!(texts, vec!["".to_string(), "al".to_string()]);

    paint(&form("alice", "", None), &mut states, &fm);
    assert!(states.values().any(|s| {
        let s = s.borrow();
        s.text == "alice" && s.selection == (5..5)
    }));

    // Fields that leave the tree lose their state.
    paint(&Column(Modifier::new()), &mut states, &fm);
    assert!(states.is_empty());
}

#[test]
fn control_characters_in_value_do_not_reset_the_caret() {
    let mut states = TextFieldStates::new();
    let fm = FocusManager::new();
    paint(&form("al\nice", "", None), &mut states, &fm);
    let user = states
        .values()
        .find(|s| s.borrow().text == "alice")
        .unwrap()
        .clone();
    user.borrow_mut().move_home(false);

    paint(&form("al\nice", "", None), &mut states, &fm);
    assert_eq!(user.borrow().text, "alice");
    assert_eq!(user.borrow().selection, 0..0);
}

#[test]
fn empty_fields_show_resting_labels() {
    let mut states = TextFieldStates::new();
    let (scene, _, sems) = paint(&form("", "", None), &mut states, &FocusManager::new());
    assert!(sems.iter().filter(|s| s.role == Role::TextField).all(|s| s.value.as_deref() == Some("")));
    let labels: Vec<_> = scene
        .nodes
        .iter()
        .filter_map(|n| match n {
            SceneNode::Text { text, size, .. } => Some((text.clone(), *size)),
            _ => None,
        })
        .collect();
    assert!(labels.contains(&("username".to_string(), 16.0)));
    assert!(labels.contains(&("password".to_string(), 16.0)));
}

#[test]
fn stack_layers_share_the_frame() {
    let pixels: Arc<[u8]> = Arc::from(vec![255u8; 4 * 4 * 2]);
    let handle = insert_image(4, 2, pixels);
    let root = Surface(
        Modifier::new().fill_max_size(),
        Stack(Modifier::new().fill_max_size()).child((
            Image(Modifier::new().fill_max_size(), handle).image_fit(ImageFit::Cover),
            Box(Modifier::new().fill_max_size().semantics(Semantics::new(Role::Container).label("content"))),
        )),
    );
    let mut states = TextFieldStates::new();
    let (scene, hits, sems) = paint(&root, &mut states, &FocusManager::new());

    let img = scene.nodes.iter().find_map(|n| match n {
        SceneNode::Image { rect, uv, .. } => Some((*rect, *uv)),
        _ => None,
    });
    let (rect, uv) = img.expect("image node");
    assert_eq!(rect, Rect::new(0.0, 0.0, 400.0, 800.0));
    // 2:1 source into a 1:2 frame keeps the middle quarter horizontally
    assert!((uv[0] - 0.375).abs() < 1e-4 && (uv[2] - 0.625).abs() < 1e-4);
    assert!(hits.is_empty());

    let content = sems.iter().find(|s| s.label.as_deref() == Some("content")).unwrap();
    assert_eq!(content.rect, Rect::new(0.0, 0.0, 400.0, 800.0));
    if let Some(h) = handle {
        remove_image(h);
    }
}

#[test]
fn missing_image_draws_nothing() {
    let root = Image(Modifier::new().size(80.0, 80.0), None);
    let mut states = TextFieldStates::new();
    let (scene, _, _) = paint(&root, &mut states, &FocusManager::new());
    assert!(!scene.nodes.iter().any(|n| matches!(n, SceneNode::Image { .. })));
}

#[test]
fn active_toast_is_painted_last() {
    toast::reset();
    set_frame_time(Instant::now());
    toast::Toast::make_text("Something went wrong", toast::ToastDuration::Short).show();
    let mut states = TextFieldStates::new();
    let (scene, _, _) = paint(&Column(Modifier::new()), &mut states, &FocusManager::new());
    let last_text = scene.nodes.iter().rev().find_map(|n| match n {
        SceneNode::Text { text, .. } => Some(text.clone()),
        _ => None,
    });
    assert_eq!(last_text.as_deref(), Some("Something went wrong"));
    toast::reset();
}
