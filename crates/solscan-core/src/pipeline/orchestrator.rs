use std::path::Path;

use ndarray::Array2;
use tracing::info;

use crate::analysis::border::{estimate_circle, full_height_limits, vertical_limits};
use crate::analysis::line_fit::{fit_spectral_line, LineFit};
use crate::analysis::polynomial::Polynomial;
use crate::analysis::statistics::{compute_mean_max_with_progress, StatisticsImages};
use crate::correction::{correct_transversalium, CorrectionProfile};
use crate::error::{Result, SolscanError};
use crate::filters::geometry::{crop_width_square, flip_horizontal};
use crate::frame::{CircleFit, CropRect, VideoInfo};
use crate::io::fits::FitsHeader;
use crate::io::{ContainerReader, FrameSource};
use crate::presentation::{render_doppler, render_intensity, DopplerRenditions, IntensityRenditions};
use crate::reconstruct::{DiskImage, DiskKind, DiskReconstructor, ExtractionMode, NoPreview, PreviewObserver};

use super::config::ReconstructionOptions;
use super::log::ProcessingLog;
use super::types::{PipelineStage, ProgressReporter};

/// Everything learned before the reconstruction pass.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub info: VideoInfo,
    /// Absent when an operator polynomial replaced detection.
    pub stats: Option<StatisticsImages>,
    /// Disk rows used for the line fit, after the margin.
    pub limits: Option<(usize, usize)>,
    pub line_fit: LineFit,
}

#[derive(Clone, Debug)]
pub struct ReconstructionOutput {
    pub disks: Vec<DiskImage>,
    pub header: FitsHeader,
    /// Always [`CircleFit::NONE`]; the circle fit belongs to the caller.
    pub circle: CircleFit,
    pub analysis: Analysis,
}

/// Statistics pass, border detection and line fit.
///
/// With an operator polynomial the polynomial is used verbatim (as the
/// reference table in doppler mode) and the statistics pass only runs when
/// FITS output is requested. When no disk rows stand out of the maximum image
/// the whole frame height is fitted instead.
pub fn analyze(
    path: &Path,
    options: &ReconstructionOptions,
    log: &mut ProcessingLog,
    reporter: &dyn ProgressReporter,
) -> Result<Analysis> {
    let mut reader = ContainerReader::open(path)?;
    let info = reader.info().clone();
    log.line(format!("Width, Height : {} {}", info.width, info.height));
    log.line(format!("Number of frames : {}", info.frame_count));
    if info.frame_count == 0 {
        return Err(SolscanError::EmptyVideo);
    }

    if let Some(coeffs) = &options.poly_fit {
        // The mean image is still wanted for FITS export.
        let stats = if options.save_fits {
            Some(statistics_pass(&mut reader, &info, reporter)?)
        } else {
            None
        };
        let polynomial = Polynomial::from_coefficients(coeffs);
        log.line(format!("Operator line polynomial : {coeffs:?}"));
        let line_fit = LineFit::from_polynomial(polynomial, info.height, info.width)?;
        return Ok(Analysis {
            info,
            stats,
            limits: None,
            line_fit,
        });
    }

    let stats = statistics_pass(&mut reader, &info, reporter)?;

    reporter.begin_stage(PipelineStage::LineFit, None);
    let (y1, y2) = match vertical_limits(stats.max.view()) {
        Ok(limits) => limits,
        Err(SolscanError::FitDegenerate(reason)) => {
            log.warn(format!("disk rows not detected ({reason}), using the full frame height"));
            full_height_limits(info.height)
        }
        Err(e) => return Err(e),
    };
    log.line(format!("Vertical limits y1, y2 : {y1} {y2}"));
    let line_fit = fit_spectral_line(stats.mean.view(), y1, y2)?;
    log.line(format!(
        "Spectral line polynomial fit : {:?}",
        line_fit.polynomial.coefficients()
    ));
    reporter.finish_stage();

    Ok(Analysis {
        info,
        stats: Some(stats),
        limits: Some((y1, y2)),
        line_fit,
    })
}

fn statistics_pass(
    reader: &mut ContainerReader,
    info: &VideoInfo,
    reporter: &dyn ProgressReporter,
) -> Result<StatisticsImages> {
    reporter.begin_stage(PipelineStage::Statistics, Some(info.frame_count));
    let stats = compute_mean_max_with_progress(reader, |done| reporter.advance(done))?;
    reporter.finish_stage();
    Ok(stats)
}

/// Second pass: build one disk per offset (or one dopplergram).
pub fn reconstruct_disks<O>(
    path: &Path,
    analysis: &Analysis,
    options: &ReconstructionOptions,
    log: &mut ProcessingLog,
    reporter: &dyn ProgressReporter,
    observer: &mut O,
) -> Result<Vec<DiskImage>>
where
    O: PreviewObserver + ?Sized,
{
    let mut reader = ContainerReader::open(path)?;
    let mode = if options.doppler {
        let shift = options.shifts.first().copied().ok_or_else(|| {
            SolscanError::InvalidConfig("doppler mode needs a reference offset".into())
        })?;
        ExtractionMode::Doppler { shift }
    } else {
        ExtractionMode::Intensity {
            offsets: options.shifts.clone(),
        }
    };
    log.line(format!("reader num frames: {}", reader.frame_count()));

    let reconstructor = DiskReconstructor::new(&analysis.line_fit.table, &mode, reader.frame_count())?;
    reporter.begin_stage(PipelineStage::Reconstruction, Some(reader.frame_count()));
    let disks = if options.display {
        reconstructor.run(&mut reader, observer, |done| reporter.advance(done))?
    } else {
        reconstructor.run(&mut reader, &mut NoPreview, |done| reporter.advance(done))?
    };
    reporter.finish_stage();
    Ok(disks)
}

/// Analyze and reconstruct one file.
pub fn reconstruct<O>(
    path: &Path,
    options: &ReconstructionOptions,
    log: &mut ProcessingLog,
    reporter: &dyn ProgressReporter,
    observer: &mut O,
) -> Result<ReconstructionOutput>
where
    O: PreviewObserver + ?Sized,
{
    options.validate()?;
    info!(path = %path.display(), "Processing file");
    let analysis = analyze(path, options, log, reporter)?;
    let disks = reconstruct_disks(path, &analysis, options, log, reporter, observer)?;
    let header = FitsHeader::from_video(&analysis.info);
    Ok(ReconstructionOutput {
        disks,
        header,
        circle: CircleFit::NONE,
        analysis,
    })
}

/// Bounding-box circle of a disk, or [`CircleFit::NONE`] when detection fails.
pub fn estimate_circle_or_none(disk: &DiskImage, log: &mut ProcessingLog) -> CircleFit {
    match estimate_circle(disk.data.view()) {
        Ok(circle) => {
            log.line(format!(
                "Circle estimate : centre ({:.1}, {:.1}) radius {:.1}",
                circle.cx, circle.cy, circle.radius
            ));
            circle
        }
        Err(e) => {
            log.warn(format!("circle estimate failed: {e}"));
            CircleFit::NONE
        }
    }
}

#[derive(Clone, Debug)]
pub enum Renditions {
    Intensity(IntensityRenditions),
    Doppler(DopplerRenditions),
}

/// A disk after correction, geometry and rendering.
#[derive(Clone, Debug)]
pub struct ProcessedDisk {
    pub shift: i32,
    /// Corrected, mirrored and cropped, before rotation.
    pub image: Array2<u16>,
    /// The circle in `image` coordinates.
    pub circle: CircleFit,
    pub profile: CorrectionProfile,
    pub renditions: Renditions,
}

/// Transversalium correction, mirror, square crop, then display renditions.
///
/// Dopplergrams skip the correction. `circle` is in raw disk coordinates.
pub fn post_process(
    disk: &DiskImage,
    circle: &CircleFit,
    options: &ReconstructionOptions,
    log: &mut ProcessingLog,
    reporter: &dyn ProgressReporter,
) -> Result<ProcessedDisk> {
    let (height, width) = disk.data.dim();
    let mut circle = *circle;

    reporter.begin_stage(PipelineStage::Correction, None);
    let (mut image, profile) = if options.transversalium && disk.kind == DiskKind::Intensity {
        let corrected = correct_transversalium(
            disk.data.view(),
            &circle,
            &CropRect::full((height, width)),
            options.trans_strength,
            log,
        )?;
        (corrected.image, corrected.profile)
    } else {
        (disk.data.clone(), CorrectionProfile::identity(height))
    };
    reporter.finish_stage();

    if options.flip_x {
        image = flip_horizontal(image.view());
        if !circle.is_none() {
            circle.cx = (width - 1) as f64 - circle.cx;
        }
    }
    if options.crop_width_square {
        let center = if circle.is_none() {
            width as f64 / 2.0
        } else {
            circle.cx
        };
        let (cropped, start) = crop_width_square(image.view(), center);
        image = cropped;
        if !circle.is_none() {
            circle.cx -= start as f64;
        }
    }

    reporter.begin_stage(PipelineStage::Presentation, None);
    let settings = options.presentation();
    let renditions = match disk.kind {
        DiskKind::Intensity => {
            Renditions::Intensity(render_intensity(image.view(), &circle, &settings, log))
        }
        DiskKind::Doppler => Renditions::Doppler(render_doppler(image.view(), &settings)),
    };
    reporter.finish_stage();

    Ok(ProcessedDisk {
        shift: disk.shift,
        image,
        circle,
        profile,
        renditions,
    })
}
