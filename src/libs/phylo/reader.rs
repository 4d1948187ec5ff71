use super::tree::Tree;
use std::io::Read;

/// Read a Newick tree from a file.
///
/// # Arguments
/// * `infile` - Path to the input file, or "stdin". Gzipped input is
///   handled transparently.
pub fn from_file(infile: &str) -> anyhow::Result<Tree> {
    let mut reader = intspan::reader(infile);
    let mut newick = String::new();
    reader.read_to_string(&mut newick)?;
    Ok(Tree::from_newick(newick.as_str())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.nwk");
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "(A:1,B:2)R;").unwrap();
        }

        let tree = from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.to_newick(), "(A:1,B:2)R;");
    }
}
