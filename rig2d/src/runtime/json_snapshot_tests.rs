use crate::{Bone, DeformableMesh, MeshVertex, Skeleton};

#[test]
fn pose_snapshot_serializes_bone_transforms() {
    let mut skeleton = Skeleton::new();
    skeleton
        .add_bone(Bone::new("root").with_position(1.0, 2.0).with_length(3.0))
        .unwrap();

    let json = skeleton.snapshot().to_json_string().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let bone = &value["bones"][0];
    assert_eq!(bone["name"], "root");
    assert_eq!(bone["length"], 3.0);
    assert_eq!(bone["world"]["x"], 1.0);
    assert_eq!(bone["world"]["y"], 2.0);
    assert!(bone["parent"].is_null());
}

#[test]
fn mesh_snapshot_serializes_vertices_and_triangles() {
    let mut mesh = DeformableMesh::new("tri");
    mesh.add_vertex(MeshVertex::new(0.0, 0.0, 0.0, 0.0));
    mesh.add_vertex(MeshVertex::new(1.0, 0.0, 1.0, 0.0));
    mesh.add_vertex(MeshVertex::new(0.0, 1.0, 0.0, 1.0));
    mesh.add_triangle(0, 1, 2).unwrap();

    let json = mesh.snapshot().to_json_string().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["vertices"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["vertices"][1]["position"]["x"], 1.0);
    assert_eq!(value["triangles"][0]["indices"], serde_json::json!([0, 1, 2]));
    assert!(value["texture"].is_null());
}
