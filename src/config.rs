/// Settings for the alignment stage. Defaults are the assembly-to-reference
/// preset the pipeline was built around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignConfig {
    pub aligner: String,
    pub preset: String,
    /// minimap2 `-K`, bases loaded into memory per mini-batch
    pub index_size: String,
    /// label used in output names, `<asm>_vs_<reference_name>.paf`
    pub reference_name: String,
}

impl Default for AlignConfig {
    fn default() -> Self {
        AlignConfig {
            aligner: "minimap2".to_string(),
            preset: "asm5".to_string(),
            index_size: "4G".to_string(),
            reference_name: "hg38".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftoverConfig {
    pub converter: String,
    pub liftover: String,
    pub reference_name: String,
    /// prepended to every chromosome name of the loci table
    pub chrom_prefix: String,
}

impl Default for LiftoverConfig {
    fn default() -> Self {
        LiftoverConfig {
            converter: "paf2liftover.py".to_string(),
            liftover: "liftOver".to_string(),
            reference_name: "hg38".to_string(),
            chrom_prefix: "chr".to_string(),
        }
    }
}
