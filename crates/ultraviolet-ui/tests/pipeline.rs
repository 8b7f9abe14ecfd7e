//! End-to-end: UVML markup and a UVSS stylesheet driven through a
//! [`Presentation`] frame by frame.

use std::rc::Rc;
use std::time::Duration;

use proptest::prelude::*;
use ultraviolet_ui::prelude::*;
use ultraviolet_ui::style::{self, CompilationContext, CompilerOptions};

const MARKUP: &str = r#"
<Grid Name="root">
    <StackPanel Name="list">
        <Button Name="ok" Class="primary" Height="8"/>
        <Button Name="cancel" Width="12"/>
        <TextBlock Name="score" Text="{{Score:F1}}"/>
    </StackPanel>
</Grid>
"#;

fn presentation() -> Presentation {
    Presentation::new(Rc::new(standard_registry()), PresentationConfig::default())
}

fn loaded(stylesheet: &str) -> Presentation {
    let mut p = presentation();
    let player = Rc::new(PropertyBag::new("Player").with("Score", Value::Double(2.26)));
    p.load_markup(MARKUP, Some(player)).unwrap();
    p.load_stylesheet(stylesheet).unwrap();
    p
}

fn element(p: &Presentation, name: &str) -> ElementId {
    p.find(name).unwrap_or_else(|| panic!("no element named {name}"))
}

fn double(p: &Presentation, id: ElementId, name: &str) -> f64 {
    p.value(id, name).and_then(|v| v.as_f64()).unwrap()
}

#[test]
fn markup_bindings_and_content_are_loaded() {
    let p = loaded("");
    let score = element(&p, "score");
    assert_eq!(p.value(score, "Text"), Some(Value::String("2.3".into())));

    let list = element(&p, "list");
    let children: Vec<_> = p.tree()[list].children().to_vec();
    assert_eq!(children.len(), 3);
    assert_eq!(p.tree()[children[0]].type_name(), "Button");
}

#[test]
fn specificity_and_precedence_decide_the_effective_value() {
    let p = loaded(
        "#ok { Width: 30; } \
         .primary { Width: 20; } \
         Button { Width: 10; Height: 40 !important; Opacity: 0.5; } \
         StackPanel Button { Opacity: 0.75; }",
    );
    let ok = element(&p, "ok");
    let cancel = element(&p, "cancel");

    assert_eq!(double(&p, ok, "Width"), 30.0);
    // Local values beat ordinary styles, important styles beat local values.
    assert_eq!(double(&p, cancel, "Width"), 12.0);
    assert_eq!(double(&p, ok, "Height"), 40.0);
    // The descendant selector outranks the bare type selector.
    assert_eq!(double(&p, ok, "Opacity"), 0.75);
}

#[test]
fn storyboards_play_through_frames_and_reloads_release_their_clocks() {
    let mut p = loaded(
        "@grow { target Button (#ok) { animation Width { keyframe 0 { 0 } keyframe 200 ease-in-out-quadratic { 100 } } } }",
    );
    let mut frames = FrameClock::new();
    let root = p.root().unwrap();
    let ok = element(&p, "ok");
    let cancel = element(&p, "cancel");

    assert_eq!(p.play_storyboard(root, "grow").unwrap(), 1);
    p.update(&frames.advance(Duration::from_millis(100))).unwrap();
    let halfway = double(&p, ok, "Width");
    assert!((halfway - 50.0).abs() < 1e-9, "{halfway}");
    assert_eq!(double(&p, cancel, "Width"), 12.0);

    p.update(&frames.advance(Duration::from_millis(500))).unwrap();
    assert_eq!(double(&p, ok, "Width"), 100.0);
    assert_eq!(p.animator().active_clocks(), 1);

    p.load_markup(r#"<Grid Name="fresh"/>"#, None).unwrap();
    assert_eq!(p.animator().active_clocks(), 0);
    assert!(p.find("ok").is_none());
}

#[test]
fn culture_directives_resolve_in_document_order() {
    let ru = Culture::new("ru-RU").unwrap();
    let options = CompilerOptions { execution_culture: ru, ..CompilerOptions::default() };
    let cx = CompilationContext::new(Rc::new(standard_registry())).with_options(options);
    let storyboard = "@foo { target { animation Width { keyframe 0 { 100.0 } } } }";

    let culture_of = |src: &str| {
        let (parse, doc) = style::compile_str(&cx, src);
        assert!(parse.ok() && doc.is_usable(), "{:?} {:?}", parse.diagnostics, doc.diagnostics);
        let foo = doc.storyboard("foo").unwrap();
        foo.keyframes().next().unwrap().culture().name().to_string()
    };

    assert_eq!(culture_of(storyboard), "");
    assert_eq!(culture_of(&format!("$culture {{ ru-RU }}\r\n{storyboard}")), "ru-RU");
    assert_eq!(culture_of(&format!("$culture {{ ru-RU }}\r\n$culture {{ fr-FR }}\r\n{storyboard}")), "fr-FR");
}

#[test]
fn keyframe_literals_follow_their_culture() {
    let mut p = loaded("$culture { de-DE }\n@fade { target Button (#ok) { animation Opacity { keyframe 100 { 0,25 } } } }");
    let mut frames = FrameClock::new();
    let root = p.root().unwrap();
    let ok = element(&p, "ok");

    p.play_storyboard(root, "fade").unwrap();
    p.update(&frames.advance(Duration::from_millis(100))).unwrap();
    assert_eq!(double(&p, ok, "Opacity"), 0.25);
}

#[test]
fn markup_errors_leave_the_previous_root_in_place() {
    let mut p = loaded("");
    let root = p.root().unwrap();
    assert!(matches!(p.load_markup("<Slider/>", None), Err(PresentationError::Uvml(UvmlError::UnknownType(_)))));
    assert!(matches!(p.load_markup("<Grid>", None), Err(PresentationError::Uvml(UvmlError::Markup { .. }))));
    assert_eq!(p.root(), Some(root));
}

#[test]
fn text_content_loads_as_a_literal() {
    let mut p = presentation();
    let text = p.load_markup("<Button>OK</Button>", None).unwrap();
    assert_eq!(p.value(text, "Content"), Some(Value::String("OK".into())));
    let attribute = p.load_markup(r#"<Button Content="OK"/>"#, None).unwrap();
    assert_eq!(p.value(attribute, "Content"), Some(Value::String("OK".into())));

    p.load_markup(r#"<StackPanel><Button Name="b" Content="caption"/><TextBlock Name="caption"/></StackPanel>"#, None)
        .unwrap();
    let (b, caption) = (element(&p, "b"), element(&p, "caption"));
    assert_eq!(p.value(b, "Content"), Some(Value::Element(caption)));
}

#[test]
fn reloading_replaces_the_tree_instead_of_growing_it() {
    let mut p = presentation();
    let markup = "<Grid><Button/><Button/></Grid>";
    let first = p.load_markup(markup, None).unwrap();
    for _ in 0..100 {
        p.load_markup(markup, None).unwrap();
    }
    assert_eq!(p.tree().len(), 3);
    assert!(p.tree().get(first).is_none());

    assert!(p.load_markup(r#"<Grid><Button/><Button Click="Missing"/></Grid>"#, None).is_err());
    assert_eq!(p.tree().len(), 3);
    let root = p.root().unwrap();
    assert_eq!(p.tree()[root].children().len(), 2);
}

proptest! {
    #[test]
    fn reversing_storyboards_stay_between_their_keyframes(deltas in prop::collection::vec(0u64..400, 1..40)) {
        let mut p = loaded(
            "@pulse reverse { target Button (#ok) { animation Opacity { keyframe 0 { 0.2 } keyframe 300 { 0.8 } } } }",
        );
        let mut frames = FrameClock::new();
        let root = p.root().unwrap();
        let ok = element(&p, "ok");
        p.play_storyboard(root, "pulse").unwrap();

        for delta in deltas {
            p.update(&frames.advance(Duration::from_millis(delta))).unwrap();
            let opacity = double(&p, ok, "Opacity");
            prop_assert!((0.2 - 1e-9..=0.8 + 1e-9).contains(&opacity), "opacity {}", opacity);
            prop_assert!(p.animator().is_playing(root, "pulse"));
        }
    }
}
