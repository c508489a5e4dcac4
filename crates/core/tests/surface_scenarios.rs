use pdf_engine::{fixtures, RgbaImage};
use stampdesk_core::{
    Annotation, AnnotationSurface, Color, Document, Editor, EditorConfig, EditorError,
    EventDisposition, FontSpec, Handle, PlacementKind, Point, Rect, SurfaceEvent, TextSpec,
    TextStyle, MINIMUM_ANNOTATION_SIZE,
};
use std::sync::Arc;

const EPS: f32 = 0.01;

fn editor_with_pages(pages: &[(f32, f32)]) -> Editor {
    let mut editor = Editor::with_default_engine(EditorConfig::default());
    editor.open_bytes(fixtures::blank_pdf(pages)).expect("blank document should open");
    editor.surface_mut().take_events();
    editor
}

fn letter_editor() -> Editor {
    editor_with_pages(&[(612.0, 792.0)])
}

fn text_spec(content: &str, size: f32) -> TextSpec {
    TextSpec {
        content: content.to_owned(),
        font: FontSpec::new("Helvetica", size),
        ..TextSpec::default()
    }
}

fn view(surface: &AnnotationSurface, page: usize, x: f32, y: f32) -> Point {
    surface.view_point(page, Point::new(x, y)).expect("page should be laid out")
}

fn click(surface: &mut AnnotationSurface, page: usize, x: f32, y: f32) -> EventDisposition {
    let point = view(surface, page, x, y);
    let disposition = surface.pointer_down(point, 1);
    surface.pointer_up(point);
    disposition
}

fn double_click(surface: &mut AnnotationSurface, page: usize, x: f32, y: f32) -> EventDisposition {
    let point = view(surface, page, x, y);
    surface.pointer_down(point, 1);
    surface.pointer_up(point);
    let disposition = surface.pointer_down(point, 2);
    surface.pointer_up(point);
    disposition
}

fn place_text(editor: &mut Editor, content: &str, size: f32, x: f32, y: f32) {
    editor.arm_text_placement(text_spec(content, size)).expect("document is open");
    assert_eq!(click(editor.surface_mut(), 0, x, y), EventDisposition::Consumed);
}

fn only_annotation(surface: &AnnotationSurface) -> &Annotation {
    let page = surface.document().and_then(|doc| doc.page(0)).expect("page 0 exists");
    assert_eq!(page.len(), 1);
    &page.annotations()[0]
}

#[test]
fn place_text_centers_on_click_and_selects_it() {
    let mut editor = letter_editor();
    place_text(&mut editor, "Note", 18.0, 100.0, 200.0);

    let surface = editor.surface();
    let annotation = only_annotation(surface);
    let bounds = annotation.bounds();

    assert!((bounds.center().x - 100.0).abs() < EPS);
    assert!((bounds.center().y - 200.0).abs() < EPS);
    assert!(bounds.width >= MINIMUM_ANNOTATION_SIZE.width);
    assert!(bounds.height >= MINIMUM_ANNOTATION_SIZE.height);
    assert_eq!(annotation.contents(), Some("Note"));
    assert_eq!(surface.selection().map(|s| s.annotation_id), Some(annotation.id()));
    assert!(surface.pending_placement().is_none());
    assert!(surface.overlay().is_visible());
}

#[test]
fn placement_click_does_not_start_a_drag() {
    let mut editor = letter_editor();
    editor.arm_text_placement(text_spec("Note", 18.0)).expect("document is open");

    let point = view(editor.surface(), 0, 100.0, 200.0);
    editor.surface_mut().pointer_down(point, 1);

    assert!(editor.surface().drag().is_none());
    assert_eq!(
        editor.surface_mut().pointer_drag(point.offset(30.0, 0.0)),
        EventDisposition::Forwarded
    );
}

#[test]
fn pending_placement_notifications() {
    let mut editor = letter_editor();
    editor.arm_text_placement(text_spec("Note", 18.0)).expect("document is open");
    click(editor.surface_mut(), 0, 100.0, 200.0);

    let placement_events: Vec<_> = editor
        .surface_mut()
        .take_events()
        .into_iter()
        .filter_map(|event| match event {
            SurfaceEvent::PendingPlacementChanged(kind) => Some(kind),
            _ => None,
        })
        .collect();

    assert_eq!(placement_events, vec![PlacementKind::Text, PlacementKind::None]);
}

#[test]
fn image_placement_scales_down_to_fit() {
    let mut editor = letter_editor();
    let bitmap = Arc::new(RgbaImage::new(800, 400));
    editor.arm_image_placement(bitmap).expect("document is open");
    click(editor.surface_mut(), 0, 300.0, 400.0);

    let bounds = only_annotation(editor.surface()).bounds();
    assert!((bounds.width - 240.0).abs() < EPS);
    assert!((bounds.height - 120.0).abs() < EPS);
    assert!((bounds.center().x - 300.0).abs() < EPS);
}

#[test]
fn small_image_keeps_natural_size_above_minimum() {
    let mut editor = letter_editor();
    editor.arm_image_placement(Arc::new(RgbaImage::new(100, 20))).expect("document is open");
    click(editor.surface_mut(), 0, 300.0, 400.0);

    let bounds = only_annotation(editor.surface()).bounds();
    assert!((bounds.width - 100.0).abs() < EPS);
    assert!((bounds.height - MINIMUM_ANNOTATION_SIZE.height).abs() < EPS);
}

#[test]
fn placement_near_edge_is_clamped_onto_page() {
    let mut editor = letter_editor();
    editor.arm_image_placement(Arc::new(RgbaImage::new(200, 200))).expect("document is open");
    click(editor.surface_mut(), 0, 5.0, 790.0);

    let bounds = only_annotation(editor.surface()).bounds();
    assert!((bounds.min_x() - 0.0).abs() < EPS);
    assert!((bounds.max_y() - 792.0).abs() < EPS);
}

#[test]
fn font_size_clamps_at_maximum() {
    let mut editor = letter_editor();
    place_text(&mut editor, "A", 94.0, 300.0, 400.0);
    let before = only_annotation(editor.surface()).bounds();

    assert_eq!(editor.adjust_font_size(2.0).ok(), Some(96.0));
    let after_first = only_annotation(editor.surface()).bounds();
    assert!((after_first.width - before.width * 96.0 / 94.0).abs() < EPS);
    assert!((after_first.center().x - before.center().x).abs() < EPS);

    assert_eq!(editor.adjust_font_size(2.0).ok(), Some(96.0));
    assert_eq!(only_annotation(editor.surface()).bounds(), after_first);

    let style = &only_annotation(editor.surface()).text_body().expect("text").style;
    assert_eq!(style.font.size, 96.0);
}

#[test]
fn font_size_clamps_at_minimum() {
    let mut editor = letter_editor();
    place_text(&mut editor, "Tiny", 10.0, 300.0, 400.0);

    assert_eq!(editor.adjust_font_size(-5.0).ok(), Some(8.0));
    let bounds = only_annotation(editor.surface()).bounds();
    assert!(bounds.width >= MINIMUM_ANNOTATION_SIZE.width);
    assert!(bounds.height >= MINIMUM_ANNOTATION_SIZE.height);
}

#[test]
fn font_size_on_stamp_is_not_eligible() {
    let mut editor = letter_editor();
    editor.arm_image_placement(Arc::new(RgbaImage::new(50, 50))).expect("document is open");
    click(editor.surface_mut(), 0, 300.0, 400.0);

    assert!(matches!(editor.adjust_font_size(2.0), Err(EditorError::NoEligibleSelection)));
}

#[test]
fn drag_move_is_clamped_to_page() {
    let mut editor = letter_editor();
    let style = TextStyle::from_spec(&TextSpec::default());
    if let Some(page) = editor.surface_mut().document_mut().and_then(|doc| doc.page_mut(0)) {
        page.push(Annotation::text(Rect::new(590.0, 10.0, 60.0, 40.0), "edge", style));
    }
    editor.surface_mut().refresh();

    let surface = editor.surface_mut();
    let start = view(surface, 0, 600.0, 30.0);
    assert_eq!(surface.pointer_down(start, 1), EventDisposition::Consumed);
    assert_eq!(surface.pointer_drag(start.offset(50.0, 0.0)), EventDisposition::Consumed);
    assert_eq!(surface.pointer_up(start.offset(50.0, 0.0)), EventDisposition::Consumed);

    let bounds = only_annotation(surface).bounds();
    assert!((bounds.min_x() - 552.0).abs() < EPS);
    assert!((bounds.max_x() - 612.0).abs() < EPS);
    assert!((bounds.min_y() - 10.0).abs() < EPS);
    assert!(surface.drag().is_none());
}

#[test]
fn drag_follows_every_move_and_refreshes_overlay() {
    let mut editor = letter_editor();
    place_text(&mut editor, "Move me", 14.0, 200.0, 300.0);
    let surface = editor.surface_mut();
    let start = view(surface, 0, 200.0, 300.0);
    surface.pointer_down(start, 1);

    surface.pointer_drag(start.offset(10.0, 0.0));
    let first = surface.overlay().selection_rect().expect("overlay visible");
    surface.pointer_drag(start.offset(20.0, -10.0));
    let second = surface.overlay().selection_rect().expect("overlay visible");

    assert!((second.min_x() - first.min_x() - 10.0).abs() < EPS);
    assert!((second.min_y() - first.min_y() + 10.0).abs() < EPS);
    let center = only_annotation(surface).bounds().center();
    assert!((center.x - 220.0).abs() < EPS);
    assert!((center.y - 310.0).abs() < EPS);
}

#[test]
fn resize_from_handle_keeps_opposite_corner() {
    let mut editor = letter_editor();
    place_text(&mut editor, "Resize", 14.0, 200.0, 300.0);
    let surface = editor.surface_mut();
    let before = only_annotation(surface).bounds();

    let handle = surface
        .overlay()
        .handles()
        .map(|handles| handles.get(Handle::TopLeft))
        .expect("overlay visible")
        .center();
    surface.pointer_down(handle, 1);
    surface.pointer_drag(view(surface, 0, 500.0, 0.0));
    surface.pointer_up(handle);

    let after = only_annotation(surface).bounds();
    assert_eq!(after.size(), MINIMUM_ANNOTATION_SIZE);
    assert!((after.max_x() - before.max_x()).abs() < EPS);
    assert!((after.min_y() - before.min_y()).abs() < EPS);
}

#[test]
fn empty_click_clears_selection_and_forwards() {
    let mut editor = letter_editor();
    place_text(&mut editor, "Note", 14.0, 100.0, 100.0);

    assert_eq!(click(editor.surface_mut(), 0, 500.0, 600.0), EventDisposition::Forwarded);
    assert!(editor.surface().selection().is_none());
    assert!(!editor.surface().overlay().is_visible());
}

#[test]
fn pointer_drag_without_operation_is_forwarded() {
    let mut editor = letter_editor();
    let surface = editor.surface_mut();

    assert_eq!(surface.pointer_drag(Point::new(10.0, 10.0)), EventDisposition::Forwarded);
    assert_eq!(surface.pointer_up(Point::new(10.0, 10.0)), EventDisposition::Forwarded);
}

#[test]
fn cancel_restores_text_from_last_commit() {
    let mut editor = letter_editor();
    place_text(&mut editor, "Hello", 14.0, 200.0, 300.0);
    let surface = editor.surface_mut();

    assert_eq!(double_click(surface, 0, 200.0, 300.0), EventDisposition::Consumed);
    assert!(surface.set_edit_text("Hello World"));
    assert!(surface.commit_edit());

    let center = only_annotation(surface).bounds().center();
    double_click(surface, 0, center.x, center.y);
    assert!(surface.edit_session().is_some());
    surface.set_edit_text("Something else entirely");
    assert_eq!(surface.cancel_key(), EventDisposition::Consumed);

    assert_eq!(only_annotation(surface).contents(), Some("Hello World"));
}

#[test]
fn commit_and_cancel_are_idempotent() {
    let mut editor = letter_editor();
    place_text(&mut editor, "Hello", 14.0, 200.0, 300.0);
    let surface = editor.surface_mut();
    double_click(surface, 0, 200.0, 300.0);

    assert!(surface.commit_edit());
    assert!(!surface.commit_edit());
    assert_eq!(surface.cancel_key(), EventDisposition::Forwarded);
    assert_eq!(only_annotation(surface).contents(), Some("Hello"));
}

#[test]
fn committing_blank_text_deletes_annotation() {
    let mut editor = letter_editor();
    place_text(&mut editor, "X", 14.0, 200.0, 300.0);
    let surface = editor.surface_mut();

    double_click(surface, 0, 200.0, 300.0);
    surface.set_edit_text("   ");
    surface.commit_edit();

    assert_eq!(surface.document().map(Document::annotation_count), Some(0));
    assert!(surface.selection().is_none());
}

#[test]
fn editing_hides_overlay_and_clears_selection() {
    let mut editor = letter_editor();
    place_text(&mut editor, "Hello", 14.0, 200.0, 300.0);
    let surface = editor.surface_mut();

    double_click(surface, 0, 200.0, 300.0);

    assert!(surface.selection().is_none());
    assert!(!surface.overlay().is_visible());
    assert_eq!(surface.edit_session().map(|s| s.text().to_owned()), Some("Hello".to_owned()));
}

#[test]
fn click_elsewhere_commits_edit_and_continues() {
    let mut editor = letter_editor();
    place_text(&mut editor, "First", 14.0, 100.0, 100.0);
    place_text(&mut editor, "Second", 14.0, 400.0, 600.0);
    let surface = editor.surface_mut();

    double_click(surface, 0, 100.0, 100.0);
    surface.set_edit_text("First, edited");
    assert_eq!(click(surface, 0, 400.0, 600.0), EventDisposition::Consumed);

    let page = surface.document().and_then(|doc| doc.page(0)).expect("page 0 exists");
    assert_eq!(page.annotations()[0].contents(), Some("First, edited"));
    assert_eq!(surface.selection().map(|s| s.annotation_id), Some(page.annotations()[1].id()));
    assert!(surface.edit_session().is_none());
}

#[test]
fn font_adjust_while_editing_targets_editor() {
    let mut editor = letter_editor();
    place_text(&mut editor, "Hello", 14.0, 200.0, 300.0);
    double_click(editor.surface_mut(), 0, 200.0, 300.0);
    let before = only_annotation(editor.surface()).bounds();

    assert_eq!(editor.adjust_font_size(4.0).ok(), Some(18.0));
    let session = editor.surface().edit_session().expect("still editing");
    assert_eq!(session.font().size, 18.0);
    assert_eq!(only_annotation(editor.surface()).bounds(), before);

    editor.surface_mut().commit_edit();
    let style = &only_annotation(editor.surface()).text_body().expect("text").style;
    assert_eq!(style.font.size, 18.0);
}

#[test]
fn document_swap_clears_transient_state_and_cancels_edit() {
    let mut editor = letter_editor();
    place_text(&mut editor, "Keep me", 14.0, 200.0, 300.0);
    let surface = editor.surface_mut();
    double_click(surface, 0, 200.0, 300.0);
    surface.set_edit_text("Discarded");
    surface.arm_text_placement(TextSpec::default());

    let previous = surface.set_document(None).expect("a document was open");

    assert!(surface.pending_placement().is_none());
    assert!(surface.selection().is_none());
    assert!(surface.edit_session().is_none());
    assert_eq!(previous.pages()[0].annotations()[0].contents(), Some("Keep me"));
}

#[test]
fn placement_lands_on_second_page() {
    let mut editor = editor_with_pages(&[(612.0, 792.0), (300.0, 400.0)]);
    editor.arm_text_placement(text_spec("P2", 12.0)).expect("document is open");
    click(editor.surface_mut(), 1, 150.0, 200.0);

    let document = editor.document().expect("document open");
    assert_eq!(document.pages()[0].len(), 0);
    assert_eq!(document.pages()[1].len(), 1);
    assert_eq!(editor.surface().selection().map(|s| s.page_index), Some(1));
}

#[test]
fn placement_respects_zoom() {
    let mut editor = letter_editor();
    editor.surface_mut().set_zoom(2.0);
    place_text(&mut editor, "Zoomed", 14.0, 150.0, 250.0);

    let center = only_annotation(editor.surface()).bounds().center();
    assert!((center.x - 150.0).abs() < EPS);
    assert!((center.y - 250.0).abs() < EPS);
}

#[test]
fn save_and_reopen_keeps_annotations() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("annotated.pdf");

    let mut editor = letter_editor();
    editor
        .arm_text_placement(TextSpec {
            content: "Approved".to_owned(),
            font: FontSpec::new("Courier", 20.0),
            text_color: Color::rgb(200, 0, 0),
            background: Some(Color::YELLOW),
        })
        .expect("document is open");
    click(editor.surface_mut(), 0, 200.0, 300.0);
    editor.arm_image_placement(Arc::new(RgbaImage::new(40, 40))).expect("document is open");
    click(editor.surface_mut(), 0, 400.0, 500.0);
    editor.save_document(&path).expect("save should succeed");

    let mut reopened = Editor::with_default_engine(EditorConfig::default());
    reopened.open_document(&path).expect("saved file should open");
    let page = &reopened.document().expect("document open").pages()[0];

    assert_eq!(page.len(), 2);
    let text = page.annotations()[0].text_body().expect("first annotation is text");
    assert_eq!(text.contents, "Approved");
    assert_eq!(text.style.font, FontSpec::new("Courier", 20.0));
    assert_eq!(text.style.text_color, Color::rgb(200, 0, 0));
    assert_eq!(text.style.background, Some(Color::YELLOW));
    assert!(!page.annotations()[1].is_text());
}

#[test]
fn save_to_unwritable_path_reports_failure() {
    let mut editor = letter_editor();
    let err = editor
        .save_document("/nonexistent-directory/for/sure/out.pdf")
        .expect_err("save should fail");

    assert!(matches!(err, EditorError::SaveFailure { .. }));
    assert!(editor.document().is_some());
}
