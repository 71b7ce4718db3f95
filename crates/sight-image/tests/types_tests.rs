use sight_image::{ChannelOrder, Layout, ResizeMode};

#[test]
fn test_layout_shapes() {
    assert_eq!(Layout::Nchw.shape(224, 224), vec![1, 3, 224, 224]);
    assert_eq!(Layout::Nhwc.shape(2, 5), vec![1, 2, 5, 3]);
}

#[test]
fn test_enums_use_lowercase_names() {
    assert_eq!(serde_json::to_string(&ResizeMode::Letterbox).unwrap(), "\"letterbox\"");
    assert_eq!(serde_json::from_str::<ChannelOrder>("\"bgr\"").unwrap(), ChannelOrder::Bgr);
    assert_eq!(serde_json::from_str::<Layout>("\"nhwc\"").unwrap(), Layout::Nhwc);
}

#[test]
fn test_defaults() {
    assert_eq!(ResizeMode::default(), ResizeMode::Stretch);
    assert_eq!(ChannelOrder::default(), ChannelOrder::Rgb);
    assert_eq!(Layout::default(), Layout::Nchw);
}
