use super::*;

const CANVAS: Canvas = Canvas {
    width: 1000,
    height: 500,
};

fn approx(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
}

#[test]
fn parse_recognizes_static_in_both_locales() {
    assert_eq!(CameraMove::parse("static"), CameraMove::Static);
    assert_eq!(CameraMove::parse("  STATIC "), CameraMove::Static);
    assert_eq!(CameraMove::parse("静止"), CameraMove::Static);
    assert_eq!(CameraMove::parse(""), CameraMove::Static);
}

#[test]
fn parse_defaults_every_other_tag_to_zoom_pan() {
    assert_eq!(CameraMove::parse("pan"), CameraMove::ZoomPan);
    assert_eq!(CameraMove::parse("dolly zoom"), CameraMove::ZoomPan);
    assert_eq!(CameraMove::parse("推拉"), CameraMove::ZoomPan);
}

#[test]
fn static_paths_are_the_identity_at_all_times() {
    let path = CameraPath::fixed(StagePosition::Left);
    assert_eq!(path.affine_at(0.0, CANVAS), Affine::IDENTITY);
    assert_eq!(path.affine_at(1.7, CANVAS), Affine::IDENTITY);
}

#[test]
fn zoom_pan_starts_at_identity() {
    let path = CameraPath::new(CameraMove::ZoomPan, StagePosition::Center, 2.0);
    let a = path.affine_at(0.0, CANVAS);
    for (got, want) in a.as_coeffs().iter().zip(Affine::IDENTITY.as_coeffs()) {
        assert!((got - want).abs() < 1e-12);
    }
}

#[test]
fn center_target_pans_vertically_and_zooms_about_its_anchor() {
    let path = CameraPath::new(CameraMove::ZoomPan, StagePosition::Center, 2.0);
    let a = path.affine_at(2.0, CANVAS);

    // The anchor point only moves by the pan vector.
    let anchor = Point::new(500.0, 250.0);
    assert!(approx(a * anchor, Point::new(500.0, 250.0 - PAN_DISTANCE_PX)));

    // A point 10px right of the anchor lands MAX_ZOOM * 10px right of it.
    let probe = Point::new(510.0, 250.0);
    assert!(approx(
        a * probe,
        Point::new(500.0 + 10.0 * MAX_ZOOM, 250.0 - PAN_DISTANCE_PX)
    ));
}

#[test]
fn left_and_right_targets_pan_in_opposite_directions() {
    let left = CameraPath::new(CameraMove::ZoomPan, StagePosition::Left, 1.0);
    let right = CameraPath::new(CameraMove::ZoomPan, StagePosition::Right, 1.0);

    let left_anchor = Point::new(250.0, 250.0);
    let right_anchor = Point::new(750.0, 250.0);

    let moved_left = left.affine_at(1.0, CANVAS) * left_anchor;
    let moved_right = right.affine_at(1.0, CANVAS) * right_anchor;

    assert!(approx(
        moved_left,
        Point::new(250.0 + PAN_DISTANCE_PX, 250.0)
    ));
    assert!(approx(
        moved_right,
        Point::new(750.0 - PAN_DISTANCE_PX, 250.0)
    ));
}

#[test]
fn progress_clamps_past_the_duration() {
    let path = CameraPath::new(CameraMove::ZoomPan, StagePosition::Center, 1.0);
    let at_end = path.affine_at(1.0, CANVAS);
    let past_end = path.affine_at(5.0, CANVAS);
    assert_eq!(at_end.as_coeffs(), past_end.as_coeffs());
}

#[test]
fn zero_duration_paths_never_move() {
    let path = CameraPath::new(CameraMove::ZoomPan, StagePosition::Left, 0.0);
    let a = path.affine_at(3.0, CANVAS);
    for (got, want) in a.as_coeffs().iter().zip(Affine::IDENTITY.as_coeffs()) {
        assert!((got - want).abs() < 1e-12);
    }
}
