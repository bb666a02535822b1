use crate::{Bone, DeformableMesh, Error, MeshTriangle, MeshVertex, Skeleton, TextureRef, Vector2};

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-3,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn assert_vec_approx(actual: Vector2, expected: Vector2) {
    assert_approx(actual.x, expected.x);
    assert_approx(actual.y, expected.y);
}

fn square(size: f32) -> DeformableMesh {
    let mut mesh = DeformableMesh::new("square");
    mesh.add_vertex(MeshVertex::new(0.0, 0.0, 0.0, 1.0));
    mesh.add_vertex(MeshVertex::new(size, 0.0, 1.0, 1.0));
    mesh.add_vertex(MeshVertex::new(size, size, 1.0, 0.0));
    mesh.add_vertex(MeshVertex::new(0.0, size, 0.0, 0.0));
    mesh.add_triangle(0, 1, 2).unwrap();
    mesh.add_triangle(0, 2, 3).unwrap();
    mesh
}

/// Two roots: `left` at the origin and `right` at (10, 0).
fn two_bones() -> Skeleton {
    let mut skeleton = Skeleton::new();
    skeleton
        .add_bone(Bone::new("left").with_length(10.0))
        .unwrap();
    skeleton
        .add_bone(Bone::new("right").with_position(10.0, 0.0))
        .unwrap();
    skeleton
}

#[test]
fn unweighted_vertices_pass_through() {
    let mut mesh = square(10.0);
    let mut skeleton = two_bones();
    skeleton.bone_mut(0).unwrap().set_rotation(45.0);
    skeleton.update_world_transform();

    mesh.update_deformation(&skeleton);
    for vertex in mesh.vertices() {
        assert_eq!(vertex.world_position(), vertex.position());
    }
    assert_eq!(mesh.version(), 1);
}

#[test]
fn auto_skin_weights_by_inverse_distance() {
    let mut mesh = DeformableMesh::new("strip");
    mesh.add_vertex(MeshVertex::new(2.0, 0.0, 0.0, 0.0));
    mesh.add_vertex(MeshVertex::new(10.0, 0.0, 0.0, 0.0));
    mesh.add_vertex(MeshVertex::new(50.0, 50.0, 0.0, 0.0));
    let skeleton = two_bones();

    mesh.auto_skin(&skeleton, 9.0);

    let near = mesh.vertex(0).unwrap();
    assert_eq!(near.weights().len(), 2);
    let left = 1.0 / 2.001;
    let right = 1.0 / 8.001;
    assert_approx(near.weights()[0].weight, left / (left + right));
    assert_approx(near.total_weight(), 1.0);

    // Only `right` is in range of the second vertex; the third is out of reach of both.
    let on_bone = mesh.vertex(1).unwrap();
    assert_eq!(on_bone.weights().len(), 1);
    assert_eq!(on_bone.weights()[0].bone, 1);
    assert_approx(on_bone.weights()[0].weight, 1.0);
    assert!(!mesh.vertex(2).unwrap().has_weights());
}

#[test]
fn deformation_follows_bone_rotation() {
    let mut mesh = DeformableMesh::new("arm");
    mesh.add_vertex(MeshVertex::new(5.0, 0.0, 0.0, 0.0));
    mesh.add_vertex(MeshVertex::new(5.0, 1.0, 0.0, 0.0));
    let mut skeleton = Skeleton::new();
    skeleton
        .add_bone(Bone::new("arm").with_position(2.0, 0.0).with_length(10.0))
        .unwrap();
    mesh.auto_skin(&skeleton, 100.0);

    skeleton.bone_mut(0).unwrap().set_rotation(90.0);
    skeleton.update_world_transform();
    mesh.update_deformation(&skeleton);

    // Local positions are mapped through the bone: (2, 0) + rotate((5, 0), 90).
    assert_vec_approx(mesh.vertex(0).unwrap().world_position(), Vector2::new(2.0, 5.0));
    assert_vec_approx(mesh.vertex(1).unwrap().world_position(), Vector2::new(1.0, 5.0));
    // Rest positions are untouched.
    assert_eq!(mesh.vertex(0).unwrap().position(), Vector2::new(5.0, 0.0));
}

#[test]
fn auto_skin_maps_local_positions_through_offset_bones() {
    let mut mesh = DeformableMesh::new("dot");
    mesh.add_vertex(MeshVertex::new(10.0, 0.0, 0.0, 0.0));
    let mut skeleton = Skeleton::new();
    skeleton
        .add_bone(Bone::new("root").with_position(10.0, 0.0))
        .unwrap();

    mesh.auto_skin(&skeleton, 5.0);
    assert_approx(mesh.vertex(0).unwrap().weights()[0].x, 10.0);
    mesh.update_deformation(&skeleton);
    assert_vec_approx(mesh.vertex(0).unwrap().world_position(), Vector2::new(20.0, 0.0));

    // Binding to the current pose brings the vertex back to rest.
    mesh.bind_to_pose(&skeleton);
    mesh.update_deformation(&skeleton);
    assert_vec_approx(mesh.vertex(0).unwrap().world_position(), Vector2::new(10.0, 0.0));
}

#[test]
fn auto_skin_with_invalid_radius_leaves_vertices_unweighted() {
    let mut mesh = square(10.0);
    let skeleton = two_bones();
    mesh.auto_skin(&skeleton, f32::NAN);
    assert!(mesh.vertices().iter().all(|v| !v.has_weights()));
    mesh.auto_skin(&skeleton, -1.0);
    assert!(mesh.vertices().iter().all(|v| !v.has_weights()));
}

#[test]
fn unnormalized_weights_give_the_plain_weighted_sum() {
    let mut mesh = DeformableMesh::new("half");
    mesh.add_vertex(MeshVertex::new(4.0, 2.0, 0.0, 0.0));
    mesh.add_vertex_weight(0, 0, 0.5).unwrap();

    let skeleton = two_bones();
    mesh.update_deformation(&skeleton);
    assert_vec_approx(mesh.vertex(0).unwrap().world_position(), Vector2::new(2.0, 1.0));
}

#[test]
fn deformation_blends_between_bones() {
    let mut mesh = DeformableMesh::new("blend");
    mesh.add_vertex(MeshVertex::new(5.0, 0.0, 0.0, 0.0));
    let mut skeleton = two_bones();
    mesh.set_vertex_weights(0, &[(0, 1.0), (1, 1.0)]).unwrap();

    skeleton.bone_mut(1).unwrap().set_position(10.0, 4.0);
    skeleton.update_world_transform();
    mesh.update_deformation(&skeleton);

    // Plain weights map the rest position through each bone: (5, 0) and (15, 4).
    assert_vec_approx(mesh.vertex(0).unwrap().world_position(), Vector2::new(10.0, 2.0));
}

#[test]
fn bind_to_pose_captures_current_pose() {
    let mut mesh = DeformableMesh::new("blend");
    mesh.add_vertex(MeshVertex::new(5.0, 0.0, 0.0, 0.0));
    let mut skeleton = two_bones();
    mesh.set_vertex_weights(0, &[(1, 1.0)]).unwrap();
    mesh.bind_to_pose(&skeleton);
    assert_approx(mesh.vertex(0).unwrap().weights()[0].x, -5.0);

    skeleton.bone_mut(1).unwrap().set_rotation(180.0);
    skeleton.update_world_transform();
    mesh.update_deformation(&skeleton);
    assert_vec_approx(mesh.vertex(0).unwrap().world_position(), Vector2::new(15.0, 0.0));
}

#[test]
fn missing_bone_influences_are_ignored() {
    let mut mesh = DeformableMesh::new("orphan");
    mesh.add_vertex(MeshVertex::new(1.0, 1.0, 0.0, 0.0));
    mesh.set_vertex_weights(0, &[(0, 0.5), (7, 0.5)]).unwrap();

    let mut skeleton = two_bones();
    skeleton.bone_mut(0).unwrap().set_position(3.0, 0.0);
    skeleton.update_world_transform();
    mesh.update_deformation(&skeleton);

    assert_vec_approx(mesh.vertex(0).unwrap().world_position(), Vector2::new(4.0, 1.0));
}

#[test]
fn fifth_influence_through_the_mesh() {
    let mut mesh = DeformableMesh::new("crowded");
    mesh.add_vertex(MeshVertex::new(0.0, 0.0, 0.0, 0.0));
    for (bone, weight) in [(0, 0.4), (1, 0.3), (2, 0.2), (3, 0.1)] {
        assert!(mesh.add_vertex_weight(0, bone, weight).unwrap());
    }
    assert!(!mesh.add_vertex_weight(0, 4, 0.05).unwrap());
    assert!(mesh.add_vertex_weight(0, 4, 0.15).unwrap());
    assert!(mesh.vertex(0).unwrap().weights().iter().all(|w| w.bone != 3));

    mesh.normalize_weights();
    assert_approx(mesh.vertex(0).unwrap().total_weight(), 1.0);

    assert!(matches!(
        mesh.add_vertex_weight(3, 0, 1.0),
        Err(Error::InvalidVertexIndex { index: 3 })
    ));
}

#[test]
fn contains_point_uses_deformed_positions() {
    let mut mesh = DeformableMesh::new("tri");
    mesh.add_vertex(MeshVertex::new(0.0, 0.0, 0.0, 0.0));
    mesh.add_vertex(MeshVertex::new(10.0, 0.0, 0.0, 0.0));
    mesh.add_vertex(MeshVertex::new(0.0, 10.0, 0.0, 0.0));
    mesh.add_triangle(0, 1, 2).unwrap();

    let mut skeleton = Skeleton::new();
    skeleton.add_bone(Bone::new("root")).unwrap();
    mesh.update_deformation(&skeleton);
    assert!(mesh.contains_point(Vector2::new(2.0, 2.0)));
    assert!(!mesh.contains_point(Vector2::new(20.0, 20.0)));

    mesh.auto_skin(&skeleton, 100.0);
    skeleton.bone_mut(0).unwrap().set_position(100.0, 0.0);
    skeleton.update_world_transform();
    mesh.update_deformation(&skeleton);
    assert!(!mesh.contains_point(Vector2::new(2.0, 2.0)));
    assert!(mesh.contains_point(Vector2::new(102.0, 2.0)));
}

#[test]
fn find_nearest_vertex_respects_max_distance() {
    let mesh = square(10.0);
    assert_eq!(mesh.find_nearest_vertex(Vector2::new(9.0, 8.0), 5.0), Some(2));
    assert_eq!(mesh.find_nearest_vertex(Vector2::new(5.0, 5.0), 1.0), None);
    assert_eq!(
        mesh.find_nearest_vertex(Vector2::new(-100.0, 1.0), f32::INFINITY),
        Some(0)
    );
    assert_eq!(DeformableMesh::new("empty").find_nearest_vertex(Vector2::ZERO, 1.0), None);
    assert_eq!(mesh.find_nearest_vertex(Vector2::new(0.5, 0.0), -1.0), None);
}

#[test]
fn non_finite_points_never_hit() {
    let mut mesh = DeformableMesh::new("tri");
    mesh.add_vertex(MeshVertex::new(0.0, 0.0, 0.0, 0.0));
    mesh.add_vertex(MeshVertex::new(10.0, 0.0, 0.0, 0.0));
    mesh.add_vertex(MeshVertex::new(0.0, 10.0, 0.0, 0.0));
    mesh.add_triangle(0, 1, 2).unwrap();

    assert!(!mesh.contains_point(Vector2::new(f32::NAN, f32::NAN)));
    assert!(!mesh.contains_point(Vector2::new(1000.0, f32::NAN)));
    assert!(!mesh.snapshot().contains_point(Vector2::new(f32::NAN, 1.0)));
    assert!(mesh.snapshot().contains_point(Vector2::new(1.0, 1.0)));
}

#[test]
fn remove_vertex_renumbers_triangles() {
    let mut mesh = square(10.0);
    mesh.add_vertex(MeshVertex::new(20.0, 5.0, 1.0, 0.5));
    mesh.add_triangle(1, 4, 2).unwrap();

    let removed = mesh.remove_vertex(1).unwrap();
    assert_eq!(removed.position(), Vector2::new(10.0, 0.0));
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.triangles(), [MeshTriangle::new(0, 1, 2)]);
    for triangle in mesh.triangles() {
        assert!(triangle.indices.iter().all(|&i| i < mesh.vertex_count()));
    }

    let bounds = mesh.bounds().unwrap();
    assert_approx(bounds.min_y, 0.0);
    assert_approx(bounds.max_x, 20.0);

    mesh.remove_vertex(3).unwrap();
    let bounds = mesh.bounds().unwrap();
    assert_approx(bounds.max_x, 10.0);
    assert_approx(bounds.min_y, 0.0);

    assert!(matches!(
        mesh.remove_vertex(10),
        Err(Error::InvalidVertexIndex { index: 10 })
    ));
}

#[test]
fn triangle_edits_validate_indices() {
    let mut mesh = square(10.0);
    assert!(matches!(
        mesh.add_triangle(0, 1, 4),
        Err(Error::InvalidVertexIndex { index: 4 })
    ));
    assert_eq!(mesh.triangle_count(), 2);

    assert_eq!(mesh.remove_triangle(0).unwrap(), MeshTriangle::new(0, 1, 2));
    assert_eq!(mesh.triangle_count(), 1);
    assert!(matches!(
        mesh.remove_triangle(1),
        Err(Error::InvalidTriangleIndex { index: 1 })
    ));
}

#[test]
fn vertex_edits_update_bounds() {
    let mut mesh = square(10.0);
    mesh.set_vertex_position(2, 30.0, 12.0).unwrap();
    let bounds = mesh.bounds().unwrap();
    assert_approx(bounds.max_x, 30.0);
    assert_approx(bounds.max_y, 12.0);
    assert_eq!(mesh.vertex(2).unwrap().world_position(), Vector2::new(30.0, 12.0));

    mesh.set_vertex_uv(2, 0.25, 0.75).unwrap();
    assert_eq!(mesh.vertex(2).unwrap().uv(), [0.25, 0.75]);
    assert!(mesh.set_vertex_uv(9, 0.0, 0.0).is_err());

    mesh.clear();
    assert!(mesh.bounds().is_none());
    assert_eq!(mesh.triangle_count(), 0);
}

#[test]
fn triangulate_outline() {
    let mut mesh = DeformableMesh::new("outline").with_texture(TextureRef {
        path: "images/outline.png".into(),
        width: 64,
        height: 64,
    });
    for (x, y) in [(0.0, 0.0), (20.0, 0.0), (20.0, 10.0), (10.0, 10.0), (10.0, 20.0), (0.0, 20.0)] {
        mesh.add_vertex(MeshVertex::new(x, y, x / 20.0, y / 20.0));
    }
    assert_eq!(mesh.triangulate(), 4);
    assert!(mesh.contains_point(Vector2::new(5.0, 15.0)));
    assert!(mesh.contains_point(Vector2::new(15.0, 5.0)));
    assert!(!mesh.contains_point(Vector2::new(15.0, 15.0)));
    assert_eq!(mesh.texture.as_ref().map(|t| t.width), Some(64));
}

#[test]
fn bone_removal_keeps_weights_consistent() {
    let mut mesh = DeformableMesh::new("strip");
    mesh.add_vertex(MeshVertex::new(5.0, 0.0, 0.0, 0.0));
    let mut skeleton = two_bones();
    skeleton
        .add_bone(Bone::new("tail").with_position(20.0, 0.0))
        .unwrap();
    mesh.set_vertex_weights(0, &[(0, 1.0), (2, 1.0)]).unwrap();

    skeleton.remove_bone(0).unwrap();
    mesh.remove_bone_influence(0);

    let weights = mesh.vertex(0).unwrap().weights();
    assert_eq!(weights.len(), 1);
    assert_eq!(weights[0].bone, 1);
    assert_approx(weights[0].weight, 1.0);
    assert_eq!(skeleton.bone(1).unwrap().name(), "tail");
}
