use super::*;

fn noise(res: Resolution) -> Image {
    let data = (0..res.num_pixels() * 3)
        .map(|_| fastrand::u8(..))
        .collect::<Vec<_>>();
    Image::from_rgb8(res, &data)
}

#[test]
fn crop_copies_region() {
    let mut image = Image::new(16, 16);
    image.set(5, 6, Color::RED);
    image.set(9, 9, Color::BLUE);

    let crop = image.crop(Rect::from_bounds(5, 6, 10, 10));
    assert_eq!(crop.resolution(), Resolution::new(5, 4));
    assert_eq!(crop.get(0, 0), Color::RED);
    assert_eq!(crop.get(4, 3), Color::BLUE);
    assert_eq!(crop.get(1, 1), Color::BLACK);
}

#[test]
#[should_panic]
fn crop_out_of_bounds() {
    let image = Image::new(16, 16);
    image.crop(Rect::from_bounds(10, 10, 17, 12));
}

#[test]
fn resize_to_same_size_is_identity() {
    let image = noise(Resolution::new(37, 21));
    assert_eq!(image.resize(image.resolution(), ResizeFilter::Smooth), image);
    assert_eq!(image.resize(image.resolution(), ResizeFilter::Lanczos3), image);
}

#[test]
fn resize_uniform_color() {
    let image = Image::filled(Resolution::new(130, 70), Color::from_rgb8(40, 80, 120));
    let resized = image.resize(Resolution::new(400, 215), ResizeFilter::Smooth);
    assert_eq!(resized.resolution(), Resolution::new(400, 215));
    for (x, y) in [(0, 0), (399, 214), (200, 100)] {
        assert_eq!(resized.get(x, y), Color::from_rgb8(40, 80, 120));
    }
}

#[test]
fn paste_clips_to_destination() {
    let mut canvas = Image::new(4, 4);
    let white = Image::filled(Resolution::new(3, 3), Color::WHITE);
    canvas.paste(&white, 2, -1);
    assert_eq!(canvas.get(2, 0), Color::WHITE);
    assert_eq!(canvas.get(3, 1), Color::WHITE);
    assert_eq!(canvas.get(3, 2), Color::BLACK);
    assert_eq!(canvas.get(1, 0), Color::BLACK);
}

#[test]
fn flip() {
    let mut image = Image::new(3, 1);
    image.set(0, 0, Color::RED);
    let flipped = image.flip_horizontal();
    assert_eq!(flipped.get(2, 0), Color::RED);
    assert_eq!(flipped.get(0, 0), Color::BLACK);
    assert_eq!(flipped.flip_horizontal(), image);
}

#[test]
fn luma() {
    assert_eq!(Color::BLACK.luma(), 0);
    assert_eq!(Color::WHITE.luma(), 255);
    assert_eq!(Color::RED.luma(), 76);
}

#[test]
fn encode_luma_jpeg() {
    let image = noise(Resolution::square(64));
    let jpeg = image.encode_luma_jpeg(10).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

    let decoded = Image::decode(&jpeg).unwrap();
    assert_eq!(decoded.resolution(), Resolution::square(64));
    // Decoded grayscale JPEGs expand to equal RGB channels.
    let px = decoded.get(10, 10);
    assert_eq!(px.r(), px.g());
    assert_eq!(px.g(), px.b());
}

#[test]
fn decode_garbage() {
    assert!(Image::decode(b"definitely not an image").is_err());
}
