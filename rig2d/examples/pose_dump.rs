use rig2d::{
    Bone, DeformableMesh, IkConstraint, IkManager, IkTarget, MeshVertex, Skeleton, TextureRef,
    Vector2,
};
use serde_json::json;

/// Upper arm, forearm and hand along +X, each 40 units long.
fn build_arm() -> Result<Skeleton, rig2d::Error> {
    let mut skeleton = Skeleton::new();
    let shoulder = skeleton.add_bone(Bone::new("shoulder"))?;
    let upper = skeleton.add_bone(Bone::new("upper").with_parent(shoulder).with_length(40.0))?;
    let fore = skeleton.add_bone(
        Bone::new("fore")
            .with_parent(upper)
            .with_position(40.0, 0.0)
            .with_length(40.0),
    )?;
    skeleton.add_bone(
        Bone::new("hand")
            .with_parent(fore)
            .with_position(40.0, 0.0)
            .with_length(20.0),
    )?;
    Ok(skeleton)
}

/// A strip of quads around the arm, 10 units above and below the bones.
fn build_sleeve(skeleton: &Skeleton) -> Result<DeformableMesh, rig2d::Error> {
    let mut mesh = DeformableMesh::new("sleeve").with_texture(TextureRef {
        path: "sleeve.png".to_string(),
        width: 128,
        height: 32,
    });
    let columns = 9;
    for i in 0..columns {
        let x = i as f32 * 12.5;
        let u = i as f32 / (columns - 1) as f32;
        mesh.add_vertex(MeshVertex::new(x, -10.0, u, 1.0));
        mesh.add_vertex(MeshVertex::new(x, 10.0, u, 0.0));
    }
    for i in 0..columns - 1 {
        let (a, b, c, d) = (2 * i, 2 * i + 1, 2 * i + 2, 2 * i + 3);
        mesh.add_triangle(a, c, d)?;
        mesh.add_triangle(a, d, b)?;
    }
    mesh.auto_skin(skeleton, 45.0);
    mesh.bind_to_pose(skeleton);
    Ok(mesh)
}

fn parse_target() -> Vector2 {
    let args: Vec<f32> = std::env::args()
        .skip(1)
        .filter_map(|a| a.parse().ok())
        .collect();
    match args.as_slice() {
        [x, y, ..] => Vector2::new(*x, *y),
        _ => Vector2::new(50.0, 60.0),
    }
}

fn main() -> Result<(), rig2d::Error> {
    let target = parse_target();

    let mut skeleton = build_arm()?;
    let mut mesh = build_sleeve(&skeleton)?;

    let mut ik = IkManager::new();
    ik.add_constraint(IkConstraint::chain(
        "reach",
        ["upper", "fore"],
        IkTarget::Point(target),
    ));
    ik.add_constraint(IkConstraint::look_at(
        "wrist",
        "hand",
        IkTarget::Point(target + Vector2::new(20.0, 0.0)),
    ));
    for constraint in ik.iter() {
        constraint.validate(&skeleton)?;
    }

    skeleton.update_world_transform();
    let report = ik.apply_constraints(&mut skeleton);
    mesh.update_deformation(&skeleton);

    let pose = skeleton.snapshot();
    let sleeve = mesh.snapshot();
    let out = json!({
        "target": [target.x, target.y],
        "reached": report.all_reached(),
        "constraints": report.names().collect::<Vec<_>>(),
        "pose": serde_json::to_value(&pose)?,
        "mesh": serde_json::to_value(&sleeve)?,
        "hitTestAtTarget": sleeve.contains_point(target),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
