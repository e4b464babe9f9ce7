use crate::boxes::FourCC;

/// Human-readable name of a box type, for display only.
///
/// Unlisted types map to `"Unknown Box"`.
pub fn full_name(typ: FourCC) -> &'static str {
    match &typ.0 {
        // file level
        b"ftyp" => "File Type Box",
        b"moov" => "Movie Box",
        b"mdat" => "Media Data Box",
        b"free" => "Free Space Box",
        b"skip" => "Free Space Box",
        b"meta" => "Meta Box",
        b"uuid" => "User Extension Box",

        // movie structure
        b"mvhd" => "Movie Header Box",
        b"trak" => "Track Box",
        b"tkhd" => "Track Header Box",
        b"edts" => "Edit Box",
        b"elst" => "Edit List Box",
        b"mdia" => "Media Box",
        b"mdhd" => "Media Header Box",
        b"hdlr" => "Handler Reference Box",
        b"minf" => "Media Information Box",
        b"vmhd" => "Video Media Header Box",
        b"hmhd" => "Hint Media Header Box",
        b"dinf" => "Data Information Box",
        b"stbl" => "Sample Table Box",
        b"stsd" => "Sample Description Box",
        b"stts" => "Decoding Time to Sample Box",
        b"udta" => "User Data Box",
        b"mvex" => "Movie Extends Box",
        b"moof" => "Movie Fragment Box",
        b"traf" => "Track Fragment Box",
        b"avc1" => "AVC Sample Entry",

        // items
        b"pitm" => "Primary Item Box",
        b"iloc" => "Item Location Box",
        b"iinf" => "Item Info Box",
        b"infe" => "Item Info Entry",
        b"iref" => "Item Reference Box",
        b"idat" => "Item Data Box",
        b"iprp" => "Item Properties Box",
        b"ipco" => "Item Property Container Box",
        b"ipma" => "Item Property Association Box",
        b"ispe" => "Image Spatial Extents Property",
        b"hvcC" => "HEVC Configuration Box",
        b"colr" => "Colour Information Box",

        // item reference types
        b"cdsc" => "Content Describes Reference",
        b"dimg" => "Derived Image Reference",
        b"thmb" => "Thumbnail Reference",
        b"auxl" => "Auxiliary Image Reference",
        b"base" => "Base Image Reference",
        b"prem" => "Pre-multiplied Image Reference",

        _ => "Unknown Box",
    }
}
