//! The structural editor: append/insert operations that mutate the parsed
//! model (and, for the two documented exceptions, the byte buffer) while
//! preserving segment/section containment and alignment invariants.

use std::collections::HashSet;

use crate::base;
use crate::error::Error;
use crate::header::elf::SHN_UNDEF;
use crate::header::program::SegmentFlags;
use crate::header::section::{Section, SectionFlags, SectionType};
use crate::Elf;

/// Options for [`Elf::append_data_to_segment`] / [`Elf::append_data_to_executable_segment`].
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Synthesize a new section covering the appended bytes.
    pub add_section: bool,
    /// Name for the synthesized section, required when `add_section` is set.
    pub section_name: Option<String>,
    /// Instead of adding a new section, grow the section that directly
    /// precedes the appended region.
    pub extend_existing_section: bool,
}

/// Largest power of two, capped at 16, that evenly divides `len`. Falls
/// back to 1 when `len` is 0 or odd.
fn alignment_for_len(len: usize) -> u64 {
    let mut candidate = 16u64;
    while candidate > 1 {
        if len as u64 % candidate == 0 {
            return candidate;
        }
        candidate /= 2;
    }
    1
}

impl Elf {
    fn require_parsed(&self) -> Result<(), Error> {
        if self.file_parsed {
            Ok(())
        } else {
            Err(Error::NotParsed)
        }
    }

    /// The index of the segment with the lowest `p_vaddr` strictly greater
    /// than `segment`'s end-of-memory-range, if any, plus the gap between
    /// them.
    fn next_segment_in_vaddr_space(&self, segment_index: usize) -> Option<(usize, u64)> {
        let segment = &self.segments[segment_index];
        let end = segment.p_vaddr + segment.p_memsz;
        self.segments
            .iter()
            .enumerate()
            .filter(|(i, s)| *i != segment_index && s.p_vaddr > end)
            .min_by_key(|(_, s)| s.p_vaddr)
            .map(|(i, s)| (i, s.p_vaddr - end))
    }

    fn shift_offsets_at_or_after(&mut self, cut: u64, delta: u64, skip_segments: &HashSet<usize>) {
        self.shift_section_offsets_at_or_after(cut, delta);
        for (i, segment) in self.segments.iter_mut().enumerate() {
            if skip_segments.contains(&i) {
                continue;
            }
            if segment.p_offset >= cut {
                segment.p_offset += delta;
            }
        }
        if self.header.e_phoff >= cut {
            self.header.e_phoff += delta;
        }
        if self.header.e_shoff >= cut {
            self.header.e_shoff += delta;
        }
    }

    /// Shift only section file offsets at or after `cut`, leaving every
    /// segment's `p_offset` and the header's table offsets untouched.
    fn shift_section_offsets_at_or_after(&mut self, cut: u64, delta: u64) {
        for section in &mut self.sections {
            if section.sh_offset >= cut {
                section.sh_offset += delta;
            }
        }
    }

    /// The number of free bytes in vaddr-space between `segment_index`'s end
    /// and the next segment, or `None` if no later segment bounds it (an
    /// append there is limited only by available memory, not layout).
    pub fn get_free_space_after_segment(&self, segment_index: usize) -> Result<Option<u64>, Error> {
        self.require_parsed()?;
        if segment_index >= self.segments.len() {
            return Err(Error::NotFound(format!("segment index {segment_index}")));
        }
        Ok(self.next_segment_in_vaddr_space(segment_index).map(|(_, gap)| gap))
    }

    /// Append `data` to the loadable segment at `segment_index`, shifting
    /// everything that follows it in file order. Returns
    /// `(file_offset_of_append, virtual_address_of_append)`.
    pub fn append_data_to_segment(
        &mut self,
        data: &[u8],
        segment_index: usize,
        options: &AppendOptions,
    ) -> Result<(u64, u64), Error> {
        self.require_parsed()?;
        let segment = self
            .segments
            .get(segment_index)
            .ok_or_else(|| Error::NotFound(format!("segment index {segment_index}")))?
            .clone();

        let file_offset_of_append = segment.p_offset + segment.p_filesz;
        let virtual_address_of_append = segment.p_vaddr + segment.p_memsz;
        let next = self.next_segment_in_vaddr_space(segment_index);

        let diff_p_vaddr = match &next {
            None => None,
            Some((_, gap)) => Some(*gap),
        };

        match next {
            None => {
                // No segment follows this one in vaddr-space, so only the
                // sections that live at or after the append point need their
                // file offsets bumped; other segments and the header's table
                // offsets are unaffected by appending inside this one.
                self.data
                    .splice(file_offset_of_append as usize..file_offset_of_append as usize, data.iter().copied());
                self.shift_section_offsets_at_or_after(file_offset_of_append, data.len() as u64);
            }
            Some((next_index, gap)) => {
                // `data.len() == gap` exactly fills the vaddr-space gap up to
                // the next segment without overlapping it, so only a strict
                // excess is out of room.
                if data.len() as u64 > gap {
                    return Err(Error::NoRoom {
                        requested: data.len(),
                        available: gap,
                    });
                }
                let align = segment.p_align.max(1);
                let offset_addition = ((data.len() as u64 / align) + 1) * align;

                let mut skip = self.segments[segment_index].segments_within.iter().copied().collect::<HashSet<_>>();
                skip.insert(segment_index);
                let next_segment_offset = self.segments[next_index].p_offset;
                self.shift_offsets_at_or_after(next_segment_offset, offset_addition, &skip);

                self.data.splice(
                    file_offset_of_append as usize..file_offset_of_append as usize,
                    data.iter().copied(),
                );
                let padding = (offset_addition - data.len() as u64) as usize;
                let pad_at = file_offset_of_append as usize + data.len();
                self.data.splice(pad_at..pad_at, std::iter::repeat(0u8).take(padding));
            }
        }

        let segment = &mut self.segments[segment_index];
        segment.p_filesz += data.len() as u64;
        segment.p_memsz += data.len() as u64;

        if options.add_section {
            let name = options
                .section_name
                .clone()
                .ok_or_else(|| Error::NotFound("section_name required when add_section is set".into()))?;
            self.add_new_section(
                name,
                SectionType::ProgBits,
                SectionFlags::ALLOC | SectionFlags::EXECINSTR,
                virtual_address_of_append,
                file_offset_of_append,
                data.len() as u64,
                0,
                0,
                alignment_for_len(data.len()),
                0,
            )?;
        } else if options.extend_existing_section {
            let growth = diff_p_vaddr.unwrap_or(data.len() as u64);
            if let Some(section) = self
                .sections
                .iter_mut()
                .find(|s| s.sh_addr + s.sh_size == virtual_address_of_append)
            {
                section.sh_size += growth;
            }
        }

        Ok((file_offset_of_append, virtual_address_of_append))
    }

    /// Append `data` to the first `PT_LOAD` segment with `PF_X` set and
    /// enough following vaddr-space gap.
    pub fn append_data_to_executable_segment(
        &mut self,
        data: &[u8],
        options: &AppendOptions,
    ) -> Result<(u64, u64), Error> {
        self.require_parsed()?;
        let candidate = self.segments.iter().enumerate().find(|(i, s)| {
            s.p_type == crate::header::program::SegmentType::Load
                && s.p_flags.contains(SegmentFlags::PF_X)
                && self
                    .next_segment_in_vaddr_space(*i)
                    .map(|(_, gap)| gap > data.len() as u64)
                    .unwrap_or(false)
        });
        let index = candidate
            .map(|(i, _)| i)
            .ok_or(Error::NoRoom {
                requested: data.len(),
                available: 0,
            })?;
        self.append_data_to_segment(data, index, options)
    }

    /// Add a new section, bootstrapping the section header table and
    /// `.shstrtab` if neither currently exists.
    #[allow(clippy::too_many_arguments)]
    pub fn add_new_section(
        &mut self,
        name: String,
        sh_type: SectionType,
        flags: SectionFlags,
        addr: u64,
        offset: u64,
        size: u64,
        link: u32,
        info: u32,
        align: u64,
        entsize: u64,
    ) -> Result<(), Error> {
        self.require_parsed()?;

        if self.sections.is_empty() {
            let null_section = Section {
                sh_name: 0,
                sh_type: SectionType::Null,
                sh_type_raw: SectionType::Null as u32,
                sh_flags: SectionFlags::empty(),
                sh_addr: 0,
                sh_offset: 0,
                sh_size: 0,
                sh_link: 0,
                sh_info: 0,
                sh_addralign: 0,
                sh_entsize: 0,
                name: String::new(),
            };
            let caller_name_offset = 1u32;
            let shstrtab_name_offset = caller_name_offset + name.len() as u32 + 1;
            let caller_section = Section {
                sh_name: caller_name_offset,
                sh_type,
                sh_type_raw: sh_type as u32,
                sh_flags: flags,
                sh_addr: addr,
                sh_offset: offset,
                sh_size: size,
                sh_link: link,
                sh_info: info,
                sh_addralign: align,
                sh_entsize: entsize,
                name: name.clone(),
            };

            let strtab_offset = self.data.len() as u64;
            let mut strtab_bytes = Vec::new();
            strtab_bytes.push(0u8);
            strtab_bytes.extend_from_slice(name.as_bytes());
            strtab_bytes.push(0);
            strtab_bytes.extend_from_slice(b".shstrtab");
            strtab_bytes.push(0);
            let strtab_size = strtab_bytes.len() as u64;
            let shstrtab_section = Section {
                sh_name: shstrtab_name_offset,
                sh_type: SectionType::StrTab,
                sh_type_raw: SectionType::StrTab as u32,
                sh_flags: SectionFlags::empty(),
                sh_addr: 0,
                sh_offset: strtab_offset,
                sh_size: strtab_size,
                sh_link: 0,
                sh_info: 0,
                sh_addralign: 1,
                sh_entsize: 0,
                name: ".shstrtab".into(),
            };

            self.data.extend_from_slice(&strtab_bytes);
            self.header.e_shoff = strtab_offset + strtab_size;
            self.header.e_shstrndx = 2;
            self.header.e_shentsize = self.bits.section_header_size() as u16;
            self.header.e_shnum = 3;
            self.sections = vec![null_section, caller_section, shstrtab_section];
            return Ok(());
        }

        let shstrtab_index = self.header.e_shstrndx as usize;
        let shstrtab_offset_before = self.sections[shstrtab_index].sh_offset;
        let name_offset = self.sections[shstrtab_index].sh_size as u32;
        let insertion_point = shstrtab_offset_before + self.sections[shstrtab_index].sh_size;
        let delta = name.len() as u64 + 1;

        let mut name_bytes = name.as_bytes().to_vec();
        name_bytes.push(0);
        self.data
            .splice(insertion_point as usize..insertion_point as usize, name_bytes);
        self.sections[shstrtab_index].sh_size += delta;

        let shstrtab_end_before_growth = insertion_point;
        if self.header.e_shoff == shstrtab_end_before_growth {
            self.header.e_shoff += delta;
        }
        for section in self.sections.iter_mut() {
            if section.sh_offset >= insertion_point {
                section.sh_offset += delta;
            }
        }
        for segment in self.segments.iter_mut() {
            if segment.p_offset >= insertion_point {
                segment.p_offset += delta;
            }
        }

        let new_section = Section {
            sh_name: name_offset,
            sh_type,
            sh_type_raw: sh_type as u32,
            sh_flags: flags,
            sh_addr: addr,
            sh_offset: offset,
            sh_size: size,
            sh_link: link,
            sh_info: info,
            sh_addralign: align,
            sh_entsize: entsize,
            name,
        };

        let insert_at = self
            .sections
            .iter()
            .position(|s| s.sh_offset > new_section.sh_offset)
            .unwrap_or(self.sections.len());
        self.sections.insert(insert_at, new_section);
        if insert_at <= self.header.e_shstrndx as usize {
            self.header.e_shstrndx += 1;
        }
        self.header.e_shnum += 1;

        Ok(())
    }

    /// Remove the section named `name`.
    pub fn delete_section_by_name(&mut self, name: &str) -> Result<(), Error> {
        self.require_parsed()?;
        let index = self
            .sections
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        self.sections.remove(index);
        self.header.e_shnum = self.header.e_shnum.saturating_sub(1);
        let shstrndx = self.header.e_shstrndx as usize;
        if index == shstrndx {
            self.header.e_shstrndx = SHN_UNDEF;
        } else if index < shstrndx {
            self.header.e_shstrndx -= 1;
        }
        Ok(())
    }

    /// Drop the section header table entirely.
    pub fn remove_section_header_table(&mut self) -> Result<(), Error> {
        self.require_parsed()?;
        self.sections.clear();
        self.header.e_shnum = 0;
        self.header.e_shoff = 0;
        self.header.e_shentsize = 0;
        self.header.e_shstrndx = SHN_UNDEF;
        Ok(())
    }

    /// Grow (or shrink, for negative `delta`) section `s`'s recorded size.
    pub fn extend_section(&mut self, s: usize, delta: i64) -> Result<(), Error> {
        self.require_parsed()?;
        let section = self
            .sections
            .get_mut(s)
            .ok_or_else(|| Error::NotFound(format!("section index {s}")))?;
        section.sh_size = (section.sh_size as i64 + delta).max(0) as u64;
        Ok(())
    }

    /// Overwrite raw file bytes at `offset`, refusing writes that cross a
    /// segment boundary unless `force` is set.
    pub fn write_data_to_file_offset(&mut self, offset: u64, data: &[u8], force: bool) -> Result<(), Error> {
        self.require_parsed()?;
        if !force {
            let len = data.len() as u64;
            let contained = self.segments.iter().any(|s| s.contains_file_range(offset, len));
            if !contained {
                return Err(Error::OutOfSegment {
                    offset: offset as usize,
                    len: data.len(),
                });
            }
        }
        let end = offset as usize + data.len();
        base::ensure_len(&mut self.data, end);
        self.data[offset as usize..end].copy_from_slice(data);
        Ok(())
    }
}
