//! CNN architecture for leaf disease classification
//!
//! The checkpoint format only fixes {parameters, class names}; this is the
//! concrete network those parameters are bound into. Widths are recoverable
//! from the stored tensors, see [`LeafNetConfig::from_record`].

use burn::{
    config::Config,
    module::{Module, Param},
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the LeafNet CNN model
#[derive(Config, Debug)]
pub struct LeafNetConfig {
    /// Number of output classes, always `len(vocabulary)`
    pub num_classes: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Filters of the first block; each following block doubles it
    #[config(default = "32")]
    pub base_filters: usize,

    /// Width of the hidden fully connected layer
    #[config(default = "256")]
    pub hidden_units: usize,

    /// Dropout rate (only active on autodiff backends)
    #[config(default = "0.3")]
    pub dropout_rate: f64,
}

/// Conv2d -> BatchNorm -> ReLU -> MaxPool(2x2)
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        Self {
            conv,
            bn: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Leaf disease classifier
///
/// Architecture:
/// - 4 convolutional blocks, filters `base, 2*base, 4*base, 8*base`
/// - Global average pooling
/// - Hidden linear layer with ReLU and dropout
/// - Linear classification head, one logit per class
///
/// With a 224x224 input the feature map after the last block is 14x14.
#[derive(Module, Debug)]
pub struct LeafNet<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,
    pub global_pool: AdaptiveAvgPool2d,
    pub hidden: Linear<B>,
    pub dropout: Dropout,
    pub head: Linear<B>,
}

impl<B: Backend> LeafNet<B> {
    pub fn new(config: &LeafNetConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        Self {
            conv1: ConvBlock::new(config.in_channels, base, device), // 224 -> 112
            conv2: ConvBlock::new(base, base * 2, device),           // 112 -> 56
            conv3: ConvBlock::new(base * 2, base * 4, device),       // 56 -> 28
            conv4: ConvBlock::new(base * 4, base * 8, device),       // 28 -> 14
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            hidden: LinearConfig::new(base * 8, config.hidden_units).init(device),
            dropout: DropoutConfig::new(config.dropout_rate).init(),
            head: LinearConfig::new(config.hidden_units, config.num_classes).init(device),
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        // [B, C, H, W] -> [B, C, 1, 1] -> [B, C]
        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.hidden.forward(x);
        let x = Relu::new().forward(x);
        let x = self.dropout.forward(x);
        self.head.forward(x)
    }

    /// Forward pass followed by softmax over the class dimension
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(x), 1)
    }

    /// Width of the classification head
    pub fn num_classes(&self) -> usize {
        self.head.weight.dims()[1]
    }
}

/// Kernel size of every convolution
const KERNEL_SIZE: usize = 3;

impl LeafNetConfig {
    /// Recover the architecture from stored parameter shapes.
    ///
    /// Every stored tensor is checked, so a record that passes can be bound
    /// and run without shape errors. Returns a description of the first
    /// inconsistency found.
    pub fn from_record<B: Backend>(record: &LeafNetRecord<B>) -> Result<Self, String> {
        // Conv2d weight: [out_channels, in_channels, k, k]
        let [base, in_channels, _, _] = record.conv1.conv.weight.dims();
        if in_channels != 3 {
            return Err(format!("first convolution expects {} input channels, not 3", in_channels));
        }
        if base == 0 {
            return Err("first convolution has no filters".to_string());
        }

        let blocks = [&record.conv1, &record.conv2, &record.conv3, &record.conv4];
        let mut block_in = in_channels;
        for (i, block) in blocks.into_iter().enumerate() {
            let block_out = base << i;
            check_conv_block(i + 1, block, block_in, block_out)?;
            block_in = block_out;
        }

        // Linear weight: [d_input, d_output]
        let [hidden_in, hidden_units] = record.hidden.weight.dims();
        if hidden_in != block_in {
            return Err(format!(
                "hidden layer takes {} features but the last block produces {}",
                hidden_in, block_in
            ));
        }
        if let Some(bias) = &record.hidden.bias {
            check_length("hidden layer bias", bias, hidden_units)?;
        }

        let [head_in, num_classes] = record.head.weight.dims();
        if head_in != hidden_units {
            return Err(format!(
                "classification head takes {} features but the hidden layer produces {}",
                head_in, hidden_units
            ));
        }
        if let Some(bias) = &record.head.bias {
            check_length("classification head bias", bias, num_classes)?;
        }

        Ok(LeafNetConfig::new(num_classes)
            .with_in_channels(in_channels)
            .with_base_filters(base)
            .with_hidden_units(hidden_units))
    }
}

fn check_conv_block<B: Backend>(
    index: usize,
    block: &ConvBlockRecord<B>,
    in_channels: usize,
    out_channels: usize,
) -> Result<(), String> {
    let expected = [out_channels, in_channels, KERNEL_SIZE, KERNEL_SIZE];
    let actual = block.conv.weight.dims();
    if actual != expected {
        return Err(format!(
            "convolution block {} has weight shape {:?}, expected {:?}",
            index, actual, expected
        ));
    }

    if let Some(bias) = &block.conv.bias {
        check_length(&format!("convolution block {} bias", index), bias, out_channels)?;
    }

    let bn = &block.bn;
    for (name, param) in [
        ("gamma", &bn.gamma),
        ("beta", &bn.beta),
        ("running mean", &bn.running_mean),
        ("running variance", &bn.running_var),
    ] {
        check_length(&format!("batch norm {} {}", index, name), param, out_channels)?;
    }

    Ok(())
}

fn check_length<B: Backend>(
    name: &str,
    param: &Param<Tensor<B, 1>>,
    expected: usize,
) -> Result<(), String> {
    let [len] = param.dims();
    if len != expected {
        return Err(format!("{} has {} entries, expected {}", name, len, expected));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InferenceBackend;
    use burn::module::Module;

    type TestBackend = InferenceBackend;

    fn small_config(num_classes: usize) -> LeafNetConfig {
        LeafNetConfig::new(num_classes)
            .with_base_filters(4)
            .with_hidden_units(16)
    }

    #[test]
    fn test_leafnet_output_shape() {
        let device = Default::default();
        let model = LeafNet::<TestBackend>::new(&small_config(4), &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 224, 224], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 4]);
        assert_eq!(model.num_classes(), 4);
    }

    #[test]
    fn test_config_from_record_roundtrip() {
        let device = Default::default();
        let model = LeafNet::<TestBackend>::new(&small_config(7), &device);

        let config = LeafNetConfig::from_record(&model.into_record()).unwrap();

        assert_eq!(config.num_classes, 7);
        assert_eq!(config.base_filters, 4);
        assert_eq!(config.hidden_units, 16);
        assert_eq!(config.in_channels, 3);
    }

    #[test]
    fn test_config_from_record_rejects_broken_head() {
        let device = Default::default();
        let mut model = LeafNet::<TestBackend>::new(&small_config(4), &device);
        // Head that no longer matches the hidden width
        model.head = LinearConfig::new(8, 4).init(&device);

        let err = LeafNetConfig::from_record(&model.into_record()).unwrap_err();
        assert!(err.contains("classification head"));
    }

    #[test]
    fn test_config_from_record_rejects_short_hidden_bias() {
        let device = Default::default();
        let mut model = LeafNet::<TestBackend>::new(&small_config(4), &device);
        model.hidden.bias = Some(Param::from_tensor(Tensor::zeros([5], &device)));

        let err = LeafNetConfig::from_record(&model.into_record()).unwrap_err();
        assert!(err.contains("hidden layer bias has 5 entries"), "{}", err);
    }

    #[test]
    fn test_config_from_record_rejects_batch_norm_statistics() {
        let device = Default::default();
        let model = LeafNet::<TestBackend>::new(&small_config(4), &device);
        let mut record = model.into_record();
        // Block 2 has 8 filters
        record.conv2.bn.running_var = Param::from_tensor(Tensor::ones([3], &device));

        let err = LeafNetConfig::from_record(&record).unwrap_err();
        assert!(err.contains("batch norm 2 running variance"), "{}", err);
    }

    #[test]
    fn test_config_from_record_rejects_conv_bias() {
        let device = Default::default();
        let mut model = LeafNet::<TestBackend>::new(&small_config(4), &device);
        model.conv3.conv.bias = Some(Param::from_tensor(Tensor::zeros([2], &device)));

        let err = LeafNetConfig::from_record(&model.into_record()).unwrap_err();
        assert!(err.contains("convolution block 3 bias"), "{}", err);
    }
}
