/// Row-major 4x4 matrix; `m[row][col]`.
pub type Mat4 = [[f32; 4]; 4];

const FOV_Y: f32 = std::f32::consts::FRAC_PI_3;
const NEAR: f32 = 0.1;
const FAR: f32 = 1000.0;

/// Perspective view looking from `eye` at `target`, with +Y up and wgpu's
/// 0..1 depth range.
pub fn view_projection(eye: [f32; 3], target: [f32; 3], aspect: f32) -> Mat4 {
    let forward = normalize(sub(target, eye)).unwrap_or([0.0, 0.0, -1.0]);
    let side = normalize(cross(forward, [0.0, 1.0, 0.0]))
        .or_else(|| normalize(cross(forward, [0.0, 0.0, 1.0])))
        .unwrap_or([1.0, 0.0, 0.0]);
    let up = cross(side, forward);

    let view = [
        [side[0], side[1], side[2], -dot(side, eye)],
        [up[0], up[1], up[2], -dot(up, eye)],
        [-forward[0], -forward[1], -forward[2], dot(forward, eye)],
        [0.0, 0.0, 0.0, 1.0],
    ];

    let f = 1.0 / (FOV_Y / 2.0).tan();
    let aspect = if aspect > 0.0 { aspect } else { 1.0 };
    let projection = [
        [f / aspect, 0.0, 0.0, 0.0],
        [0.0, f, 0.0, 0.0],
        [0.0, 0.0, FAR / (NEAR - FAR), NEAR * FAR / (NEAR - FAR)],
        [0.0, 0.0, -1.0, 0.0],
    ];

    mul(&projection, &view)
}

pub(crate) fn transform(m: &Mat4, p: [f32; 4]) -> [f32; 4] {
    let mut out = [0.0; 4];
    for (row, o) in m.iter().zip(out.iter_mut()) {
        *o = row[0] * p[0] + row[1] * p[1] + row[2] * p[2] + row[3] * p[3];
    }
    out
}

fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for r in 0..4 {
        for c in 0..4 {
            out[r][c] = (0..4).map(|k| a[r][k] * b[k][c]).sum();
        }
    }
    out
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f32; 3]) -> Option<[f32; 3]> {
    let len = dot(v, v).sqrt();
    (len > 1e-6).then(|| [v[0] / len, v[1] / len, v[2] / len])
}

#[cfg(test)]
mod tests {
    use super::*;

    const EYE: [f32; 3] = [0.0, 0.0, 10.0];

    #[test]
    fn target_projects_to_the_center() {
        let m = view_projection(EYE, [0.0; 3], 1.5);
        let clip = transform(&m, [0.0, 0.0, 0.0, 1.0]);
        assert!(clip[0].abs() < 1e-5);
        assert!(clip[1].abs() < 1e-5);
        assert!((clip[3] - 10.0).abs() < 1e-4);
        let depth = clip[2] / clip[3];
        assert!((0.0..=1.0).contains(&depth));
    }

    #[test]
    fn points_behind_the_eye_have_negative_w() {
        let m = view_projection(EYE, [0.0; 3], 1.0);
        let clip = transform(&m, [0.0, 0.0, 20.0, 1.0]);
        assert!(clip[3] < 0.0);
    }

    #[test]
    fn right_of_target_is_right_on_screen() {
        let m = view_projection(EYE, [0.0; 3], 1.0);
        let clip = transform(&m, [1.0, 1.0, 0.0, 1.0]);
        assert!(clip[0] > 0.0);
        assert!(clip[1] > 0.0);
    }

    #[test]
    fn degenerate_views_stay_finite() {
        let looking_down = view_projection([0.0, 5.0, 0.0], [0.0; 3], 1.0);
        let same_point = view_projection(EYE, EYE, 0.0);
        for m in [looking_down, same_point] {
            assert!(m.iter().flatten().all(|v| v.is_finite()));
        }
    }
}
