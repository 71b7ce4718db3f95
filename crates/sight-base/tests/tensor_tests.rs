use sight_base::tensor::element_count;
use sight_base::{Tensor, TensorError};

#[test]
fn test_tensor_new_valid() {
    let tensor = Tensor::new(vec![1, 3], vec![0.1f32, 0.2, 0.7]).unwrap();
    assert_eq!(tensor.shape, vec![1, 3]);
    assert_eq!(tensor.ndim(), 2);
    assert_eq!(tensor.len(), 3);
}

#[test]
fn test_tensor_new_shape_mismatch() {
    let result = Tensor::new(vec![1, 3, 2, 2], vec![0.0f32; 11]);
    assert_eq!(
        result.unwrap_err(),
        TensorError::ShapeMismatch { expected: 12, got: 11 }
    );
}

#[test]
fn test_tensor_new_overflow() {
    let result = Tensor::<f32>::new(vec![usize::MAX, 2], vec![]);
    assert!(matches!(result, Err(TensorError::ShapeOverflow)));
}

#[test]
fn test_element_count_of_scalar_shape_is_one() {
    assert_eq!(element_count(&[]).unwrap(), 1);
    assert_eq!(element_count(&[1, 3, 224, 224]).unwrap(), 150_528);
}

#[test]
fn test_tensor_zeros() {
    let tensor = Tensor::<f32>::zeros(vec![1, 3, 2, 2]).unwrap();
    assert_eq!(tensor.data, vec![0.0; 12]);
}

#[test]
fn test_tensor_from_i64_shape() {
    let tensor = Tensor::from_i64_shape(&[1, 4], vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(tensor.shape, vec![1, 4]);
    assert_eq!(tensor.shape_i64(), vec![1, 4]);
}

#[test]
fn test_tensor_from_i64_shape_rejects_dynamic_dim() {
    let result = Tensor::from_i64_shape(&[-1, 4], vec![0.0f32; 4]);
    assert_eq!(result.unwrap_err(), TensorError::InvalidDimension(-1));
}

#[test]
fn test_tensor_is_empty() {
    assert!(Tensor::<f32>::new(vec![0], vec![]).unwrap().is_empty());
    assert!(!Tensor::new(vec![1], vec![1.0f32]).unwrap().is_empty());
}

#[test]
fn test_tensor_debug_omits_data() {
    let tensor = Tensor::new(vec![2], vec![1.0f32, 2.0]).unwrap();
    assert_eq!(format!("{:?}", tensor), "Tensor { shape: [2], len: 2 }");
}

#[test]
fn test_tensor_into_parts() {
    let (shape, data) = Tensor::new(vec![2], vec![5u8, 6]).unwrap().into_parts();
    assert_eq!(shape, vec![2]);
    assert_eq!(data, vec![5, 6]);
}
