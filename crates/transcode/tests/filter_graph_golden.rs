use gifcap_model::{EncodeConfig, Region};
use gifcap_transcode::{encoder_args, FilterGraph};

const PALETTE: &str =
    "split[s0][s1];[s0]palettegen=max_colors=256[p];[s1][p]paletteuse=dither=bayer:bayer_scale=5";

fn graph(region: Option<(u32, u32, u32, u32)>, fps: u32, max_width: u32) -> String {
    let region = region.map(|(x, y, w, h)| Region::new(x, y, w, h).unwrap());
    FilterGraph::for_gif(region.as_ref(), &EncodeConfig { fps, max_width }).render()
}

#[test]
fn filter_graphs_match_golden_strings() {
    let cases = [
        (
            Some((10, 20, 320, 240)),
            15,
            0,
            format!("crop=320:240:10:20,fps=15,{PALETTE}"),
        ),
        (None, 10, 0, format!("fps=10,{PALETTE}")),
        (
            None,
            24,
            640,
            format!("fps=24,scale='min(640,iw)':-1:flags=lanczos,{PALETTE}"),
        ),
        (
            Some((0, 0, 1920, 1080)),
            30,
            800,
            format!("crop=1920:1080:0:0,fps=30,scale='min(800,iw)':-1:flags=lanczos,{PALETTE}"),
        ),
    ];

    for (region, fps, max_width, expected) in cases {
        assert_eq!(graph(region, fps, max_width), expected);
    }
}

#[test]
fn argument_vector_ends_with_overwrite_and_output() {
    let graph = FilterGraph::for_gif(None, &EncodeConfig { fps: 15, max_width: 0 });
    let args = encoder_args(
        std::path::Path::new("/tmp/temp_1.webm"),
        &graph,
        std::path::Path::new("/tmp/recording_1.gif"),
    );
    let rendered: Vec<String> = args
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    assert_eq!(rendered[0], "-hide_banner");
    assert_eq!(&rendered[1..3], ["-i", "/tmp/temp_1.webm"]);
    assert_eq!(rendered[3], "-filter_complex");
    assert_eq!(&rendered[5..], ["-y", "/tmp/recording_1.gif"]);
}
