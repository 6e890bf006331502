use nalgebra::{point, vector, Point3, Rotation3, Unit, Vector2, Vector3};

use crate::common::{BoundBox, Ray};

/// View angle used by [`PerspectiveCamera::new`], in degrees
pub const DEFAULT_VIEW_ANGLE: f32 = 30.0;

/// Interactive camera manipulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraMove {
    /// Rotate position around the view up axis through the focal point, degrees
    Azimuth(f32),
    /// Rotate position around the right axis through the focal point, degrees
    Elevation(f32),
    /// Move towards the focal point, factor > 1 moves closer
    Dolly(f32),
    /// Move both position and focal point on the view plane, world units
    Pan(Vector2<f32>),
    SetPosition(Point3<f32>),
    SetFocalPoint(Point3<f32>),
    SetViewUp(Vector3<f32>),
    /// Vertical view angle in degrees, `(0;180)`
    SetViewAngle(f32),
}

/// Ray-casting camera
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Position of the camera in world coordinates
    position: Point3<f32>,
    /// Point the camera looks at
    focal_point: Point3<f32>,
    /// Requested up direction, not necessarily orthogonal to the view direction
    view_up: Vector3<f32>,
    /// Vertical field of view in degrees
    view_angle: f32,
    /// Aspect ratio of image plane, width / height
    aspect: f32,
    /// Unit direction of view
    direction: Vector3<f32>,
    /// Unit right direction from the camera's perspective
    right: Vector3<f32>,
    /// Unit up direction, orthogonal to `direction` and `right`
    up: Vector3<f32>,
    /// Direction of ray passing through the upper left corner of the image plane
    dir_00: Vector3<f32>,
    /// Offset across the whole image plane width
    du: Vector3<f32>,
    /// Offset across the whole image plane height, pointing down
    dv: Vector3<f32>,
}

impl PerspectiveCamera {
    /// Construct new camera looking from `position` at `focal_point`
    ///
    /// View up is the positive y axis, aspect ratio is 1.
    pub fn new(position: Point3<f32>, focal_point: Point3<f32>) -> PerspectiveCamera {
        let mut camera = PerspectiveCamera {
            position,
            focal_point,
            view_up: vector![0.0, 1.0, 0.0],
            view_angle: DEFAULT_VIEW_ANGLE,
            aspect: 1.0,
            direction: vector![0.0, 0.0, -1.0],
            right: vector![1.0, 0.0, 0.0],
            up: vector![0.0, 1.0, 0.0],
            dir_00: Vector3::zeros(),
            du: Vector3::zeros(),
            dv: Vector3::zeros(),
        };
        camera.recalc();
        camera
    }

    /// Changes aspect ratio to match `(width, height)` resolution
    pub fn change_aspect_from_resolution(&mut self, width: usize, height: usize) {
        if width == 0 || height == 0 {
            return;
        }
        self.change_aspect(width as f32 / height as f32);
    }

    /// For example 1.7777 for 16:9 ratio
    pub fn change_aspect(&mut self, aspect_ratio: f32) {
        self.aspect = aspect_ratio;
        self.recalc();
    }

    /// Apply one interactive manipulation
    pub fn apply(&mut self, movement: CameraMove) {
        match movement {
            CameraMove::Azimuth(deg) => self.azimuth(deg),
            CameraMove::Elevation(deg) => self.elevation(deg),
            CameraMove::Dolly(factor) => self.dolly(factor),
            CameraMove::Pan(delta) => self.pan(delta),
            CameraMove::SetPosition(pos) => {
                self.position = pos;
                self.recalc();
            }
            CameraMove::SetFocalPoint(focal) => {
                self.focal_point = focal;
                self.recalc();
            }
            CameraMove::SetViewUp(up) => {
                self.view_up = up;
                self.recalc();
            }
            CameraMove::SetViewAngle(deg) => {
                if deg > 0.0 && deg < 180.0 {
                    self.view_angle = deg;
                    self.recalc();
                }
            }
        }
    }

    pub fn azimuth(&mut self, deg: f32) {
        let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(self.up), deg.to_radians());
        self.orbit(rotation);
    }

    pub fn elevation(&mut self, deg: f32) {
        let rotation =
            Rotation3::from_axis_angle(&Unit::new_normalize(-self.right), deg.to_radians());
        self.view_up = rotation * self.up;
        self.orbit(rotation);
    }

    pub fn dolly(&mut self, factor: f32) {
        if factor <= 0.0 || !factor.is_finite() {
            return;
        }
        let offset = self.position - self.focal_point;
        self.position = self.focal_point + offset / factor;
        self.recalc();
    }

    pub fn pan(&mut self, delta: Vector2<f32>) {
        let shift = delta.x * self.right + delta.y * self.up;
        self.position += shift;
        self.focal_point += shift;
        self.recalc();
    }

    /// Look at the center of `bound_box` from a distance at which the whole box
    /// fits into the view, keeping the current view direction
    pub fn reset_to_box(&mut self, bound_box: &BoundBox) {
        let radius = bound_box.radius();
        let half_angle = (0.5 * self.view_angle).to_radians();
        let distance = radius / half_angle.sin();

        self.focal_point = bound_box.center();
        self.position = self.focal_point - distance * self.direction;
        self.recalc();
    }

    // rotate position around the focal point
    fn orbit(&mut self, rotation: Rotation3<f32>) {
        let offset = self.position - self.focal_point;
        self.position = self.focal_point + rotation * offset;
        self.recalc();
    }

    // Call after any change of the defining parameters
    fn recalc(&mut self) {
        if let Some(direction) = (self.focal_point - self.position).try_normalize(f32::EPSILON) {
            self.direction = direction;
        }

        self.right = match self.direction.cross(&self.view_up).try_normalize(f32::EPSILON) {
            Some(right) => right,
            None => {
                // view up parallel to the view direction
                let fallback = if self.direction.y.abs() < 0.9 {
                    Vector3::y()
                } else {
                    Vector3::z()
                };
                self.direction.cross(&fallback).normalize()
            }
        };
        self.up = self.right.cross(&self.direction);

        let height = 2.0 * f32::tan((0.5 * self.view_angle).to_radians());
        let width = height * self.aspect;

        self.du = width * self.right;
        self.dv = -height * self.up; // Notice '-' sign, rows go down
        self.dir_00 = self.direction - 0.5 * self.du - 0.5 * self.dv;
    }

    /// Get ray originating in the camera position crossing view plane in coordinates `pixel_coord`
    ///
    /// # Arguments
    ///
    /// * pixel_coord - Coordinates in the range of `<0;1>x<0;1>`, point \[0,0\] being upper left corner
    pub fn get_ray(&self, pixel_coord: (f32, f32)) -> Ray {
        let dir = self.dir_00 + self.du * pixel_coord.0 + self.dv * pixel_coord.1;
        Ray::new(self.position, dir)
    }

    pub fn get_pos(&self) -> Point3<f32> {
        self.position
    }

    pub fn get_focal_point(&self) -> Point3<f32> {
        self.focal_point
    }

    pub fn get_dir(&self) -> Vector3<f32> {
        self.direction
    }

    pub fn get_up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn get_view_angle(&self) -> f32 {
        self.view_angle
    }

    pub fn distance(&self) -> f32 {
        (self.focal_point - self.position).norm()
    }
}

impl Default for PerspectiveCamera {
    /// Camera on the positive z axis looking at the origin
    fn default() -> Self {
        PerspectiveCamera::new(point![0.0, 0.0, 1.0], Point3::origin())
    }
}
