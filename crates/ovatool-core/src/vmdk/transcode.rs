//! Stream transcoder: the central engine that reads a monolithic-sparse
//! VMDK and writes a stream-optimized, DEFLATE-compressed VMDK.
//!
//! This is a single-threaded, single-pass, non-resumable operation: the
//! source is read once, grain by grain, in grain-directory order, and
//! everything is written to the destination as it is produced. Nothing
//! about the output is rewritten after the fact — the output ordering
//! (data, then grain tables, then directory, then footer) is exactly the
//! order things are emitted.

use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use flate2::write::DeflateEncoder;
use flate2::Compression;
use log::{debug, info};
use memmap2::Mmap;

use crate::error::{Error, Result};

use super::descriptor;
use super::grain_table::load_grain_tables;
use super::header::SparseHeader;
use super::sector::{make_control_marker, make_grain_marker, pad_to_sector, MarkerType, SECTOR_SIZE};

/// One GiB in bytes.
const GIB: u64 = 1 << 30;

/// Computes the new capacity, in sectors, for a requested target size in
/// GiB, rounded up to a whole number of grain tables.
///
/// Fails with [`Error::ResizeTooSmall`] if the result would be smaller than
/// `source_capacity_sectors`.
fn resize_capacity(
    source_capacity_sectors: u64,
    target_gib: u64,
    sectors_in_gt: u64,
) -> Result<u64> {
    let target_sectors = target_gib
        .checked_mul(GIB)
        .ok_or_else(|| Error::resize_too_small(format!("{target_gib} GiB overflows a u64 sector count")))?
        / SECTOR_SIZE;
    let new_gts = super::header::div_ceil(target_sectors, sectors_in_gt);
    let capacity_new = new_gts * sectors_in_gt;

    if capacity_new < source_capacity_sectors {
        return Err(Error::resize_too_small(format!(
            "target capacity {capacity_new} sectors ({target_gib} GiB, rounded) is smaller than \
             source capacity {source_capacity_sectors} sectors"
        )));
    }

    Ok(capacity_new)
}

/// Transcodes a monolithic-sparse VMDK read from `reader` into a
/// stream-optimized VMDK written to `writer`, resized to `target_gib`
/// GiB (rounded up to a whole number of grain tables).
///
/// `reader` must support random access (grains are read out of order
/// relative to the source file, in grain-directory order); `writer` must
/// support position queries, since several fields record the sector offset
/// at which the GD/GT/footer were written.
pub fn transcode<R: Read + Seek, W: Write + Seek>(
    reader: &mut R,
    writer: &mut W,
    target_gib: u64,
) -> Result<()> {
    let source_header = SparseHeader::read_from(reader)?;
    source_header.validate_monolithic_sparse()?;

    let sectors_in_gt = source_header.grain_size * source_header.num_gtes_per_gt as u64;
    let capacity_new = resize_capacity(source_header.capacity, target_gib, sectors_in_gt)?;
    let new_gts = capacity_new / sectors_in_gt;

    info!(
        "transcoding: source capacity {} sectors, target capacity {} sectors ({} grain tables)",
        source_header.capacity, capacity_new, new_gts
    );

    let grain_tables = load_grain_tables(reader, &source_header)?;

    let out_header = source_header.as_stream_optimized(capacity_new);

    // 1. Header sector.
    writer.write_all(&out_header.to_bytes())?;

    // 2. Descriptor block.
    let descriptor_bytes = descriptor::render(capacity_new);
    writer.write_all(&descriptor_bytes)?;

    // 3. Zero padding up to overHead sectors from file start.
    let pos = writer.stream_position()?;
    let over_head_bytes = source_header.over_head * SECTOR_SIZE;
    if over_head_bytes > pos {
        let pad_len = (over_head_bytes - pos) as usize;
        writer.write_all(&vec![0u8; pad_len])?;
    }

    // 4. Grain data, grain tables, one source GT at a time.
    let mut new_grain_directory: Vec<u32> = Vec::with_capacity(new_gts as usize);
    let mut in_ptr: u64 = 0;

    for gt in &grain_tables {
        if gt.iter().all(|&gte| gte == 0) {
            new_grain_directory.push(0);
            in_ptr += sectors_in_gt;
            continue;
        }

        let mut out_gt = vec![0u32; source_header.num_gtes_per_gt as usize];
        for (i, &gte) in gt.iter().enumerate() {
            if gte <= 1 {
                in_ptr += source_header.grain_size;
                continue;
            }

            reader.seek(SeekFrom::Start(u64::from(gte) * SECTOR_SIZE))?;
            let mut grain_data = vec![0u8; (source_header.grain_size * SECTOR_SIZE) as usize];
            reader.read_exact(&mut grain_data)?;

            let compressed = compress_grain(&grain_data)?;

            assert_sector_aligned(writer.stream_position()?, "before grain marker")?;
            out_gt[i] = (writer.stream_position()? / SECTOR_SIZE) as u32;

            let marker = make_grain_marker(in_ptr, &compressed)?;
            writer.write_all(&marker)?;

            in_ptr += source_header.grain_size;
        }

        assert_sector_aligned(writer.stream_position()?, "before grain table marker")?;

        let mut gt_bytes = Vec::with_capacity(out_gt.len() * 4);
        for entry in &out_gt {
            gt_bytes.extend_from_slice(&entry.to_le_bytes());
        }
        let gt_bytes = pad_to_sector(gt_bytes);
        let gt_size_sectors = gt_bytes.len() as u64 / SECTOR_SIZE;

        writer.write_all(&make_control_marker(MarkerType::GrainTable, gt_size_sectors))?;
        new_grain_directory.push((writer.stream_position()? / SECTOR_SIZE) as u32);
        writer.write_all(&gt_bytes)?;

        debug!(
            "wrote grain table ({} populated grains)",
            out_gt.iter().filter(|&&e| e != 0).count()
        );
    }

    // 5. Pad the new grain directory to the requested capacity.
    new_grain_directory.resize(new_gts as usize, 0);

    // 6. Grain directory.
    let mut gd_bytes = Vec::with_capacity(new_grain_directory.len() * 4);
    for entry in &new_grain_directory {
        gd_bytes.extend_from_slice(&entry.to_le_bytes());
    }
    let gd_bytes = pad_to_sector(gd_bytes);
    let gd_size_sectors = gd_bytes.len() as u64 / SECTOR_SIZE;

    assert_sector_aligned(writer.stream_position()?, "before grain directory marker")?;
    writer.write_all(&make_control_marker(MarkerType::GrainDirectory, gd_size_sectors))?;
    let gd_offset_new = writer.stream_position()? / SECTOR_SIZE;
    writer.write_all(&gd_bytes)?;

    // 7. Footer.
    assert_sector_aligned(writer.stream_position()?, "before footer marker")?;
    writer.write_all(&make_control_marker(MarkerType::Footer, 1))?;
    let footer_header = out_header.with_gd_offset(gd_offset_new);
    writer.write_all(&footer_header.to_bytes())?;

    // 8. End of stream.
    assert_sector_aligned(writer.stream_position()?, "before end-of-stream marker")?;
    writer.write_all(&make_control_marker(MarkerType::EndOfStream, 0))?;

    writer.flush()?;
    info!("transcode complete: grain directory at sector {gd_offset_new}");
    Ok(())
}

/// DEFLATE-compresses a grain with zlib's default compression level.
fn compress_grain(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish().map_err(Error::from)
}

fn assert_sector_aligned(pos: u64, context: &str) -> Result<()> {
    if pos % SECTOR_SIZE != 0 {
        return Err(Error::internal_alignment(format!(
            "output position {pos} is not sector-aligned ({context})"
        )));
    }
    Ok(())
}

/// Opens `source_path`, memory-maps it for random reads, and transcodes it
/// into a newly-created file at `dest_path`.
///
/// On failure, the partially-written destination file is removed, except
/// for `Error::InternalAlignment`: that indicates a transcoder bug rather
/// than bad input, and the partial output is left in place for debugging.
pub fn transcode_paths(source_path: &Path, dest_path: &Path, target_gib: u64) -> Result<()> {
    let source_file = File::open(source_path).map_err(|e| Error::io(e, source_path))?;
    // Safety: `source_file` is opened read-only for the duration of the
    // mapping and is not concurrently modified by this process.
    let mmap = unsafe { Mmap::map(&source_file).map_err(|e| Error::io(e, source_path))? };
    let mut source = Cursor::new(&mmap[..]);

    let dest_file = File::create(dest_path).map_err(|e| Error::io(e, dest_path))?;
    let mut writer = BufWriter::new(dest_file);

    let result = transcode(&mut source, &mut writer, target_gib);
    match result {
        Ok(()) => {
            writer.flush().map_err(|e| Error::io(e, dest_path))?;
            Ok(())
        }
        Err(err @ Error::InternalAlignment(_)) => {
            drop(writer);
            Err(err)
        }
        Err(err) => {
            drop(writer);
            let _ = std::fs::remove_file(dest_path);
            Err(err)
        }
    }
}
