use std::error::Error;

use nalgebra::{point, vector, Point3};
use volcaster::{
    render::{CancelToken, ParallelRenderer, RenderOptions},
    test_helpers, BlendMode, CameraMove, Frame, RenderError, RenderSession, SessionState,
    SliderPanel, TransferFunctionEdit, VoxelVolume,
};

pub const WIDTH: usize = 48;
pub const HEIGHT: usize = 32;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session() -> RenderSession {
    init_logger();
    let options = RenderOptions::builder()
        .resolution(WIDTH, HEIGHT)
        .worker_count(3)
        .tile_side(16)
        .build()
        .unwrap();
    RenderSession::new(options)
}

type EncodeResult = Result<(), Box<dyn Error + Send + Sync>>;

#[test]
fn export_before_render_fails() {
    let mut session = session();
    let mut encoder = |_: &Frame| -> EncodeResult { Ok(()) };

    assert!(matches!(
        session.export_frame(&mut encoder),
        Err(RenderError::NoFrame)
    ));

    session.load_volume(test_helpers::sphere_volume(16));
    assert!(matches!(
        session.export_frame(&mut encoder),
        Err(RenderError::NoFrame)
    ));
}

#[test]
fn render_without_volume_fails() {
    let mut session = session();
    assert!(matches!(session.render(), Err(RenderError::NoVolume)));
    assert_eq!(session.state(), SessionState::Empty);
}

#[test]
fn invalid_volume_rejected() {
    let mut session = session();
    let res = session.load_decoded(
        vector![4, 0, 4],
        vector![1.0, 1.0, 1.0],
        Point3::origin(),
        Vec::<u8>::new(),
    );
    assert!(matches!(res, Err(RenderError::InvalidVolume(_))));
    assert_eq!(session.state(), SessionState::Empty);
}

#[test]
fn load_render_export() {
    let mut session = session();
    session.load_volume(test_helpers::sphere_volume(16));
    session.render().unwrap();
    assert_eq!(session.state(), SessionState::Rendered);

    let mut bytes = Vec::new();
    let mut encoder = |frame: &Frame| -> EncodeResult {
        bytes = frame.to_rgb8();
        Ok(())
    };
    session.export_frame(&mut encoder).unwrap();
    assert_eq!(bytes.len(), 3 * WIDTH * HEIGHT);

    // ball in the middle, black background around it
    let center = 3 * (HEIGHT / 2 * WIDTH + WIDTH / 2);
    assert!(bytes[center] > 0);
    assert_eq!(&bytes[0..3], &[0, 0, 0]);
}

#[test]
fn rendering_is_deterministic() {
    let mut session = session();
    session.load_volume(test_helpers::sphere_volume(16));
    session.move_camera(CameraMove::Azimuth(30.0));
    session.move_camera(CameraMove::Elevation(20.0));

    for mode in BlendMode::ALL {
        session.set_blend_mode(mode);
        let first = session.render().unwrap();
        let second = session.render().unwrap();
        assert_eq!(first, second, "{mode}");
    }
}

#[test]
fn parallel_matches_serial() {
    init_logger();
    let mut scene = test_helpers::sphere_scene(16, (WIDTH, HEIGHT), BlendMode::Composite);

    scene.options.worker_count = 1;
    let serial = ParallelRenderer::new(&scene)
        .unwrap()
        .render(&CancelToken::new())
        .unwrap();

    scene.options.worker_count = 5;
    scene.options.tile_side = 7;
    let parallel = ParallelRenderer::new(&scene)
        .unwrap()
        .render(&CancelToken::new())
        .unwrap();

    assert_eq!(serial, parallel);
}

#[test]
fn maximum_intensity_of_row() {
    init_logger();
    let scene = test_helpers::row_scene(&[100.0, 900.0, 300.0], BlendMode::MaximumIntensity);
    let sampler = volcaster::render::RaySampler::new(&scene);

    let ray = volcaster::common::Ray::new(point![-1.0, 0.5, 0.5], vector![1.0, 0.0, 0.0]);
    let pixel = sampler.cast_ray(&ray);

    let color = scene.color.evaluate(900.0).unwrap();
    let opacity = scene.opacity.evaluate(900.0).unwrap();
    assert!((pixel.xyz() - color * opacity).norm() < 1e-6);
    assert!((pixel.w - opacity).abs() < 1e-6);
}

#[test]
fn uniform_volume_two_samples() {
    init_logger();
    let scene = test_helpers::uniform_scene(500.0, BlendMode::Composite);
    let sampler = volcaster::render::RaySampler::new(&scene);

    let ray = volcaster::common::Ray::new(point![-1.0, 0.5, 0.5], vector![1.0, 0.0, 0.0]);
    let pixel = sampler.cast_ray(&ray);
    assert!((pixel.w - 0.75).abs() < 1e-6);
}

#[test]
fn superseded_render_never_leaks() {
    let mut session = session();
    session.load_volume(test_helpers::sphere_volume(16));

    session.set_blend_mode(BlendMode::Additive);
    session.request_render().unwrap();

    session.set_blend_mode(BlendMode::MinimumIntensity);
    session.request_render().unwrap();

    let frame = session.wait_frame().unwrap().unwrap();
    let expected = session.render().unwrap();
    assert_eq!(*frame, *expected);
}

#[test]
fn edits_do_not_rerender() {
    let mut session = session();
    session.load_volume(test_helpers::sphere_volume(16));
    let frame = session.render().unwrap();

    session.set_blend_mode(BlendMode::IsoSurface);
    session.set_iso_value(Some(250.0));
    session
        .edit_transfer_function(TransferFunctionEdit::OpacityPoint {
            value: 500.0,
            opacity: 0.2,
        })
        .unwrap();
    session.move_camera(CameraMove::Dolly(1.5));

    assert!(session.is_frame_stale());
    assert_eq!(session.frame().as_deref(), Some(&*frame));
}

#[test]
fn slider_panel_apply() {
    let mut session = session();
    let data: Vec<u16> = (0..8 * 8 * 8).map(|i| (i % 4000) as u16).collect();
    let volume = VoxelVolume::with_unit_spacing(vector![8, 8, 8], data).unwrap();
    session.load_volume(volume);

    let mut panel = SliderPanel::new();
    panel.set_intensity_range(3663).unwrap();
    panel.min_opacity.set_value(100);
    panel.max_opacity.set_value(500);
    panel.blend_mode_index = 3;

    assert!(matches!(
        panel.set_intensity_range(200_000),
        Err(RenderError::InvalidIntensityRange(200_000))
    ));

    let frame = panel.apply(&mut session).unwrap();
    assert_eq!(frame.resolution(), (WIDTH, HEIGHT));
    assert_eq!(session.blend_mode(), BlendMode::AverageIntensity);

    panel.blend_mode_index = 2;
    panel.apply_in_background(&mut session).unwrap();
    let frame = session.wait_frame().unwrap().unwrap();
    assert_eq!(session.blend_mode(), BlendMode::MinimumIntensity);
    assert_eq!(session.frame().as_deref(), Some(&*frame));
}
