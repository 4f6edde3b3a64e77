use fitsio::FitsFile;
use ndarray::Array2;

use solscan_core::io::fits::{write_fits, FitsHeader};
use solscan_core::io::image_io::{load_image, save_image, save_png16, save_tiff16};
use solscan_core::io::ser::SerHeader;
use solscan_core::io::ser_writer::SerWriter;

fn pattern() -> Array2<u16> {
    Array2::from_shape_fn((5, 7), |(r, c)| (r * 10_000 + c * 7) as u16)
}

#[test]
fn test_png16_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.png");
    save_png16(pattern().view(), &path).unwrap();
    assert_eq!(load_image(&path).unwrap(), pattern());
}

#[test]
fn test_tiff16_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.tiff");
    save_tiff16(pattern().view(), &path).unwrap();
    assert_eq!(load_image(&path).unwrap(), pattern());
}

#[test]
fn test_save_image_picks_format_from_extension() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("a.tif");
    let png = dir.path().join("b.png");
    save_image(pattern().view(), &tif).unwrap();
    save_image(pattern().view(), &png).unwrap();
    assert_eq!(&std::fs::read(&tif).unwrap()[..2], b"II");
    assert_eq!(&std::fs::read(&png).unwrap()[1..4], b"PNG");
}

#[test]
fn test_fits_file_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.fits");
    let header = FitsHeader {
        naxis1: 7,
        naxis2: 5,
        bin1: 2,
        bin2: 1,
        exptime: 0.0,
        observer: Some("Tester".into()),
        instrument: None,
        telescope: None,
    };
    write_fits(&path, pattern().view(), &header).unwrap();

    let mut fptr = FitsFile::open(&path).unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    assert_eq!(hdu.read_key::<i64>(&mut fptr, "NAXIS1").unwrap(), 7);
    assert_eq!(hdu.read_key::<i64>(&mut fptr, "NAXIS2").unwrap(), 5);
    assert_eq!(hdu.read_key::<i64>(&mut fptr, "BITPIX").unwrap(), 16);
    assert_eq!(hdu.read_key::<i64>(&mut fptr, "BZERO").unwrap(), 32768);
    assert_eq!(hdu.read_key::<i64>(&mut fptr, "BIN1").unwrap(), 2);
    assert_eq!(hdu.read_key::<f64>(&mut fptr, "EXPTIME").unwrap(), 0.0);
    assert_eq!(hdu.read_key::<String>(&mut fptr, "OBSERVER").unwrap(), "Tester");

    let samples: Vec<u16> = hdu.read_image(&mut fptr).unwrap();
    let expected: Vec<u16> = pattern().iter().copied().collect();
    assert_eq!(samples, expected);
}

#[test]
fn test_fits_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.fits");
    std::fs::write(&path, b"stale").unwrap();

    let header = FitsHeader {
        naxis1: 7,
        naxis2: 5,
        bin1: 1,
        bin2: 1,
        exptime: 0.0,
        observer: None,
        instrument: None,
        telescope: None,
    };
    let data = Array2::from_elem((5, 7), 65535u16);
    write_fits(&path, data.view(), &header).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len() % 2880, 0);
    assert!(bytes.starts_with(b"SIMPLE  ="));

    let mut fptr = FitsFile::open(&path).unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    let samples: Vec<u16> = hdu.read_image(&mut fptr).unwrap();
    assert!(samples.iter().all(|&v| v == 65535));
}

#[test]
fn test_ser_writer_counts_frames_and_rejects_bad_sizes() {
    let header = SerHeader::mono(7, 5, 16, 2);
    let mut writer = SerWriter::new(Vec::new(), &header).unwrap();
    writer.write_frame(pattern().view()).unwrap();
    assert!(writer.write_frame(Array2::zeros((7, 5)).view()).is_err());
    assert!(writer.write_raw_frame(&[0u8; 3]).is_err());
    writer.write_frame(pattern().view()).unwrap();
    assert_eq!(writer.frames_written(), 2);
    writer.write_timestamps(&[1, 2]).unwrap();
    let bytes = writer.finalize().unwrap();
    assert_eq!(bytes.len(), 178 + 2 * 7 * 5 * 2 + 16);
}
